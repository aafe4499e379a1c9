//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system resources (wall clock, randomness).
//! Enables deterministic simulation (virtual clock, seeded RNG) and production
//! use with real system resources.

use thiserror::Error;

/// The randomness source could not produce bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("randomness source failed: {0}")]
pub struct EntropyError(pub String);

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - `random_bytes()` fails rather than returning predictable bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError>;

    /// Seconds since the Unix epoch, for persisted timestamps.
    fn wall_clock_secs(&self) -> u64;
}
