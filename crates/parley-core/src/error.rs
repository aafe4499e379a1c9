//! Error types for the per-actor session layer.

use parley_crypto::KeyGenerationError;
use thiserror::Error;

use crate::env::EntropyError;

/// Errors surfaced by [`CryptoService`](crate::CryptoService).
///
/// A missing session is never one of them: encrypt and decrypt establish
/// sessions lazily. Decryption failures are reported as
/// [`DecryptionError`](parley_crypto::DecryptionError) directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// An actor id was empty
    #[error("actor id must not be empty")]
    EmptyActorId,

    /// Key material could not be generated. Fatal for crypto initialization.
    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] KeyGenerationError),

    /// No nonce could be drawn for an outgoing message
    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

impl SessionError {
    /// Returns true if the error must abort the actor's crypto
    /// initialization.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyGeneration(_) | Self::Entropy(_))
    }
}
