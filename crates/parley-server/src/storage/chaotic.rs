//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to test error handling.
//! Fan-out must tolerate any subset of persistence calls failing.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use parley_crypto::SessionId;
use parley_proto::KeyBundle;

use super::{SaveOutcome, Storage, StorageError, StoredSession};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but randomly fails
/// operations based on a configured failure rate. Failed operations never
/// reach the inner storage. Uses Arc<Mutex<>> for the RNG state, making it
/// Clone and thread-safe.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operation counter
    operation_count: Arc<Mutex<usize>>,
    /// Injected failure counter
    failure_count: Arc<Mutex<usize>>,
}

/// Linear congruential generator. Same seed, same failure sequence.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }

    fn should_fail(&mut self, failure_rate: f64) -> bool {
        self.next() < failure_rate
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Create a new chaotic storage wrapper with a fixed seed
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(Mutex::new(0)),
            failure_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    #[allow(clippy::expect_used)]
    pub fn operation_count(&self) -> usize {
        *self.operation_count.lock().expect("operation_count mutex poisoned")
    }

    /// Number of operations that were failed by injection.
    #[allow(clippy::expect_used)]
    pub fn failure_count(&self) -> usize {
        *self.failure_count.lock().expect("failure_count mutex poisoned")
    }

    /// Count the operation and decide whether to fail it.
    #[allow(clippy::expect_used)]
    fn inject(&self) -> Result<(), StorageError> {
        *self.operation_count.lock().expect("operation_count mutex poisoned") += 1;

        let fail =
            self.rng.lock().expect("ChaoticRng mutex poisoned").should_fail(self.failure_rate);
        if fail {
            *self.failure_count.lock().expect("failure_count mutex poisoned") += 1;
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn load_session_record(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<Option<StoredSession>, StorageError> {
        self.inject()?;
        self.inner.load_session_record(session_id, room_id)
    }

    fn save_session_record(&self, record: &StoredSession) -> Result<SaveOutcome, StorageError> {
        self.inject()?;
        self.inner.save_session_record(record)
    }

    fn increment_message_counter(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<u64, StorageError> {
        self.inject()?;
        self.inner.increment_message_counter(session_id, room_id)
    }

    fn list_room_sessions(&self, room_id: &str) -> Result<Vec<StoredSession>, StorageError> {
        self.inject()?;
        self.inner.list_room_sessions(room_id)
    }

    fn load_key_bundle(&self, actor_id: &str) -> Result<Option<KeyBundle>, StorageError> {
        self.inject()?;
        self.inner.load_key_bundle(actor_id)
    }

    fn save_key_bundle(&self, actor_id: &str, bundle: &KeyBundle) -> Result<(), StorageError> {
        self.inject()?;
        self.inner.save_key_bundle(actor_id, bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn zero_rate_never_fails() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 0.0);
        for _ in 0..100 {
            storage.list_room_sessions("r1").unwrap();
        }
        assert_eq!(storage.operation_count(), 100);
        assert_eq!(storage.failure_count(), 0);
    }

    #[test]
    fn full_rate_always_fails_and_skips_inner() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 1.0);
        let record = StoredSession::derive(&SessionId::canonicalize("a", "b"), "r1", 0);

        assert!(storage.save_session_record(&record).is_err());
        assert_eq!(storage.inner().session_count(), 0);
        assert_eq!(storage.failure_count(), 1);
    }

    #[test]
    fn same_seed_same_failures() {
        let run = |seed| {
            let storage = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, seed);
            (0..32).map(|_| storage.list_room_sessions("r").is_err()).collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }
}
