//! Session secret derivation.
//!
//! The secret for a pair is the first 32 bytes of SHA-512 over the canonical
//! session id. No timestamp, randomness or key material feeds the hash, so
//! every actor that evaluates it for the same pair gets the same secret.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::identity::SessionId;

/// Size of a session secret in bytes.
pub const SESSION_SECRET_SIZE: usize = 32;

/// Symmetric secret shared by the two participants of a session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSecret([u8; SESSION_SECRET_SIZE]);

impl SessionSecret {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; SESSION_SECRET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; SESSION_SECRET_SIZE] {
        &self.0
    }

    /// Standard base64 encoding, as persisted by the relay.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Decode a persisted secret. `None` if the encoding or length is wrong.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        let mut decoded = BASE64.decode(encoded).ok()?;
        let bytes: Option<[u8; SESSION_SECRET_SIZE]> = decoded.as_slice().try_into().ok();
        decoded.zeroize();
        bytes.map(Self)
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret([REDACTED])")
    }
}

impl Drop for SessionSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Derive the session secret for a canonical session id.
///
/// # Security
///
/// - Deterministic: same pair, same secret, on every actor
/// - Not a key exchange: anyone who knows both actor ids can derive it
pub fn derive_session_secret(session_id: &SessionId) -> SessionSecret {
    let digest = Sha512::digest(session_id.as_key().as_bytes());

    let mut secret = [0u8; SESSION_SECRET_SIZE];
    secret.copy_from_slice(&digest[..SESSION_SECRET_SIZE]);

    SessionSecret(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let secret = derive_session_secret(&SessionId::canonicalize("alice", "bob"));
        assert_eq!(secret.to_base64(), "bPKobJgnqQC6eNyOYOyRF5IsfoybjB9e9WptjxnjVpc=");
    }

    #[test]
    fn derive_is_symmetric() {
        let ab = derive_session_secret(&SessionId::canonicalize("alice", "bob"));
        let ba = derive_session_secret(&SessionId::canonicalize("bob", "alice"));
        assert_eq!(ab, ba);
    }

    #[test]
    fn different_pairs_produce_different_secrets() {
        let ab = derive_session_secret(&SessionId::canonicalize("alice", "bob"));
        let ac = derive_session_secret(&SessionId::canonicalize("alice", "carol"));
        assert_ne!(ab, ac);
    }

    #[test]
    fn base64_roundtrip() {
        let secret = derive_session_secret(&SessionId::canonicalize("x", "y"));
        let restored = SessionSecret::from_base64(&secret.to_base64()).unwrap();
        assert_eq!(restored, secret);
    }

    #[test]
    fn base64_rejects_wrong_length() {
        assert!(SessionSecret::from_base64("AAAA").is_none());
        assert!(SessionSecret::from_base64("not base64!").is_none());
    }

    #[test]
    fn debug_redacts() {
        let secret = derive_session_secret(&SessionId::canonicalize("alice", "bob"));
        assert_eq!(format!("{secret:?}"), "SessionSecret([REDACTED])");
    }
}
