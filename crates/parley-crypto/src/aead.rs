//! Envelope encryption using `XChaCha20-Poly1305`
//!
//! All functions are pure - the nonce must be provided by the caller.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use parley_proto::EncryptedEnvelope;

use crate::{derivation::SessionSecret, error::DecryptionError};

/// `XChaCha20` nonce size (24 bytes)
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// How much of the envelope header the AEAD tag covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderBinding {
    /// Only the ciphertext is authenticated. Header fields are advisory and
    /// may be rewritten in transit without detection.
    #[default]
    Unbound,

    /// Sender, recipient and both message numbers are authenticated as
    /// associated data. Rewriting any of them fails decryption.
    Bound,
}

impl HeaderBinding {
    fn associated_data(self, envelope: &EncryptedEnvelope) -> Vec<u8> {
        match self {
            Self::Unbound => Vec::new(),
            Self::Bound => header_associated_data(envelope),
        }
    }
}

/// Associated data for a [`HeaderBinding::Bound`] envelope.
///
/// Each header field is written as a 4-byte big-endian length followed by its
/// bytes, so no two distinct headers encode alike.
pub fn header_associated_data(envelope: &EncryptedEnvelope) -> Vec<u8> {
    let fields = [
        envelope.sender_key_id.as_bytes(),
        envelope.recipient_key_id.as_bytes(),
        envelope.message_number.as_bytes(),
        envelope.previous_message_number.as_bytes(),
    ];

    let mut aad = Vec::with_capacity(fields.iter().map(|f| 4 + f.len()).sum());
    for field in fields {
        aad.extend_from_slice(&(field.len() as u32).to_be_bytes());
        aad.extend_from_slice(field);
    }
    aad
}

/// Encrypt raw bytes under a session secret, authenticating `aad` alongside.
///
/// Returns ciphertext with the 16-byte tag appended.
///
/// # Security
///
/// - Caller MUST never reuse a nonce under the same secret
/// - Caller MUST provide cryptographically secure random bytes in production
pub fn seal(
    plaintext: &[u8],
    secret: &SessionSecret,
    nonce: [u8; NONCE_SIZE],
    aad: &[u8],
) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(secret.as_bytes().into());
    let payload = Payload { msg: plaintext, aad };

    let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), payload) else {
        unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt bytes produced by [`seal`].
///
/// # Errors
///
/// - `AuthenticationFailed` if the tag, secret, nonce or `aad` does not match
pub fn open(
    ciphertext: &[u8],
    secret: &SessionSecret,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>, DecryptionError> {
    let cipher = XChaCha20Poly1305::new(secret.as_bytes().into());

    cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| DecryptionError::AuthenticationFailed)
}

/// Encrypt a text message into a wire envelope.
///
/// `message_number` is the sender's counter after incrementing; the previous
/// number is one less. Both are advisory and not bound into the ciphertext.
pub fn encrypt_envelope(
    sender_id: &str,
    recipient_id: &str,
    plaintext: &str,
    secret: &SessionSecret,
    nonce: [u8; NONCE_SIZE],
    message_number: u64,
) -> EncryptedEnvelope {
    encrypt_envelope_with(
        HeaderBinding::Unbound,
        sender_id,
        recipient_id,
        plaintext,
        secret,
        nonce,
        message_number,
    )
}

/// Encrypt a text message into a wire envelope under an explicit
/// [`HeaderBinding`].
pub fn encrypt_envelope_with(
    binding: HeaderBinding,
    sender_id: &str,
    recipient_id: &str,
    plaintext: &str,
    secret: &SessionSecret,
    nonce: [u8; NONCE_SIZE],
    message_number: u64,
) -> EncryptedEnvelope {
    let mut envelope = EncryptedEnvelope {
        encrypted_content: String::new(),
        sender_key_id: sender_id.to_string(),
        recipient_key_id: recipient_id.to_string(),
        message_number: message_number.to_string(),
        previous_message_number: message_number.saturating_sub(1).to_string(),
        nonce: Some(BASE64.encode(nonce)),
    };

    let aad = binding.associated_data(&envelope);
    envelope.encrypted_content = BASE64.encode(seal(plaintext.as_bytes(), secret, nonce, &aad));
    envelope
}

/// Decrypt a wire envelope back to text.
///
/// Never returns partial plaintext: either the whole message authenticates
/// and decodes, or an error is returned.
///
/// # Errors
///
/// - `MissingNonce` if the envelope carries no nonce
/// - `MalformedEnvelope` if nonce or ciphertext is not valid base64
/// - `InvalidNonce` if the nonce does not decode to 24 bytes
/// - `AuthenticationFailed` if the AEAD rejects the ciphertext
/// - `InvalidUtf8` if the authenticated plaintext is not UTF-8
pub fn decrypt_envelope(
    envelope: &EncryptedEnvelope,
    secret: &SessionSecret,
) -> Result<String, DecryptionError> {
    decrypt_envelope_with(HeaderBinding::Unbound, envelope, secret)
}

/// Decrypt a wire envelope produced under `binding`.
///
/// # Errors
///
/// As [`decrypt_envelope`]. Under [`HeaderBinding::Bound`] a rewritten header
/// field also yields `AuthenticationFailed`.
pub fn decrypt_envelope_with(
    binding: HeaderBinding,
    envelope: &EncryptedEnvelope,
    secret: &SessionSecret,
) -> Result<String, DecryptionError> {
    let encoded_nonce = envelope.nonce.as_deref().ok_or(DecryptionError::MissingNonce)?;

    let nonce_bytes = BASE64.decode(encoded_nonce).map_err(|e| {
        DecryptionError::MalformedEnvelope { field: "nonce", reason: e.to_string() }
    })?;
    let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
        DecryptionError::InvalidNonce { expected: NONCE_SIZE, got: nonce_bytes.len() }
    })?;

    let ciphertext = BASE64.decode(&envelope.encrypted_content).map_err(|e| {
        DecryptionError::MalformedEnvelope { field: "encryptedContent", reason: e.to_string() }
    })?;

    let aad = binding.associated_data(envelope);
    let plaintext = open(&ciphertext, secret, &nonce, &aad)?;
    String::from_utf8(plaintext).map_err(|_| DecryptionError::InvalidUtf8)
}
