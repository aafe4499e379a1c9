//! Error types for session cryptography.

use thiserror::Error;

/// Why an envelope could not be decrypted.
///
/// Every variant means no plaintext was produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    /// Envelope carries no nonce
    #[error("nonce is required for decryption")]
    MissingNonce,

    /// Nonce decoded to the wrong length
    #[error("invalid nonce length: expected {expected}, got {got}")]
    InvalidNonce {
        /// Required nonce length
        expected: usize,
        /// Decoded length
        got: usize,
    },

    /// A field of the envelope could not be decoded
    #[error("malformed envelope field {field}: {reason}")]
    MalformedEnvelope {
        /// Wire name of the field
        field: &'static str,
        /// Decoder message
        reason: String,
    },

    /// No session could be resolved or established for the pair
    #[error("no session between {sender} and {recipient}")]
    NoSession {
        /// Sending actor
        sender: String,
        /// Receiving actor
        recipient: String,
    },

    /// The AEAD rejected the ciphertext (wrong key, tampering, nonce mismatch)
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Authenticated plaintext is not valid UTF-8
    #[error("plaintext is not valid UTF-8")]
    InvalidUtf8,

    /// Message number was not above the last accepted one
    #[error("replayed message number {number} (last accepted {last_accepted})")]
    Replayed {
        /// Number carried by the envelope
        number: u64,
        /// Highest number accepted so far for this sender
        last_accepted: u64,
    },
}

/// Why a key bundle could not be generated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyGenerationError {
    /// The randomness source failed
    #[error("randomness source failed: {0}")]
    Entropy(String),

    /// Caller supplied the wrong amount of entropy
    #[error("entropy length mismatch: expected {expected}, got {got}")]
    EntropyLength {
        /// Bytes required
        expected: usize,
        /// Bytes supplied
        got: usize,
    },
}
