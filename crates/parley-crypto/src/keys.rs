//! Key bundle generation.
//!
//! Each actor owns one identity key pair, one signed pre-key pair and a batch
//! of one-time pre-key pairs, all X25519. The public halves are published as a
//! [`KeyBundle`]. None of them participate in session derivation.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use parley_proto::KeyBundle;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::KeyGenerationError;

/// Size of an X25519 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Number of one-time pre-keys in a freshly generated bundle.
pub const DEFAULT_ONE_TIME_PRE_KEYS: usize = 10;

/// Registration ids are drawn from `0..REGISTRATION_ID_RANGE`.
pub const REGISTRATION_ID_RANGE: u16 = 10_000;

/// Bytes of entropy needed to generate a bundle with `one_time_count`
/// one-time pre-keys.
///
/// One 32-byte secret per key pair plus two bytes for the registration id.
pub const fn entropy_len(one_time_count: usize) -> usize {
    (2 + one_time_count) * KEY_SIZE + 2
}

/// An X25519 key pair.
#[derive(Clone)]
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Build a key pair from 32 secret bytes (clamped by X25519).
    pub fn from_secret_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public key bytes.
    pub fn public_bytes(&self) -> &[u8; KEY_SIZE] {
        self.public.as_bytes()
    }

    /// Public key, base64-encoded.
    pub fn public_base64(&self) -> String {
        BASE64.encode(self.public.as_bytes())
    }

    /// Secret key bytes. Never leave the owning actor's process.
    pub fn secret_bytes(&self) -> [u8; KEY_SIZE] {
        self.secret.to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_base64())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Full key material of one actor, private halves included.
#[derive(Clone, Debug)]
pub struct KeyMaterial {
    identity: KeyPair,
    signed_pre_key: KeyPair,
    one_time_pre_keys: Vec<KeyPair>,
    registration_id: u16,
}

impl KeyMaterial {
    /// Generate key material from caller-provided entropy.
    ///
    /// `entropy` must be exactly [`entropy_len`]`(one_time_count)` bytes of
    /// cryptographically secure randomness.
    ///
    /// # Errors
    ///
    /// - `KeyGenerationError::EntropyLength` if `entropy` has the wrong size
    pub fn from_entropy(
        entropy: &[u8],
        one_time_count: usize,
    ) -> Result<Self, KeyGenerationError> {
        let expected = entropy_len(one_time_count);
        if entropy.len() != expected {
            return Err(KeyGenerationError::EntropyLength { expected, got: entropy.len() });
        }

        let (key_bytes, registration_bytes) = entropy.split_at(expected - 2);
        let mut pairs = key_bytes.chunks_exact(KEY_SIZE).map(|chunk| {
            let mut secret = [0u8; KEY_SIZE];
            secret.copy_from_slice(chunk);
            KeyPair::from_secret_bytes(secret)
        });

        let (Some(identity), Some(signed_pre_key)) = (pairs.next(), pairs.next()) else {
            unreachable!("entropy length checked above");
        };
        let one_time_pre_keys: Vec<KeyPair> = pairs.collect();
        debug_assert_eq!(one_time_pre_keys.len(), one_time_count);

        let registration_id =
            u16::from_be_bytes([registration_bytes[0], registration_bytes[1]])
                % REGISTRATION_ID_RANGE;

        Ok(Self { identity, signed_pre_key, one_time_pre_keys, registration_id })
    }

    /// Identity key pair.
    pub fn identity(&self) -> &KeyPair {
        &self.identity
    }

    /// Signed pre-key pair.
    pub fn signed_pre_key(&self) -> &KeyPair {
        &self.signed_pre_key
    }

    /// One-time pre-key pairs, in generation order.
    pub fn one_time_pre_keys(&self) -> &[KeyPair] {
        &self.one_time_pre_keys
    }

    /// Advisory registration id.
    pub fn registration_id(&self) -> u16 {
        self.registration_id
    }

    /// Public bundle for publication.
    pub fn public_bundle(&self) -> KeyBundle {
        KeyBundle {
            identity_key: self.identity.public_base64(),
            signed_pre_key: self.signed_pre_key.public_base64(),
            one_time_pre_keys: self.one_time_pre_keys.iter().map(KeyPair::public_base64).collect(),
            registration_id: self.registration_id.to_string(),
        }
    }
}
