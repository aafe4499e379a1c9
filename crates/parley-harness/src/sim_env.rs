//! Deterministic environment for simulation.
//!
//! Randomness comes from a seeded ChaCha20 RNG and time from a virtual clock
//! that only moves when the test advances it. Clones share both, so every
//! actor in a world draws from one reproducible stream.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use parley_core::{EntropyError, Environment};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Wall clock reported at virtual time zero (2023-11-14T22:13:20Z).
pub const SIM_EPOCH_SECS: u64 = 1_700_000_000;

/// Seeded, virtually clocked [`Environment`].
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    elapsed: Arc<Mutex<Duration>>,
}

impl SimEnv {
    /// Create an environment whose byte stream is fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the virtual clock forward.
    #[allow(clippy::expect_used)]
    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().expect("Mutex poisoned");
        *elapsed = elapsed.saturating_add(by);
    }

    /// Virtual time since creation.
    #[allow(clippy::expect_used)]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("Mutex poisoned")
    }
}

impl Environment for SimEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        self.rng.lock().expect("Mutex poisoned").fill_bytes(buffer);
        Ok(())
    }

    fn wall_clock_secs(&self) -> u64 {
        SIM_EPOCH_SECS + self.elapsed().as_secs()
    }
}
