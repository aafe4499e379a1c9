//! Property-based tests for the crypto service
//!
//! Two independent services stand in for two actors. They share nothing but
//! the envelopes passed between them.
//!
//! 1. **Idempotence**: establishing twice equals establishing once
//! 2. **Round-trip**: decrypt(b, a, encrypt(a, b, m)) == m
//! 3. **Lazy bootstrap**: the receiver never calls establish
//! 4. **Monotonic numbering**: in-order delivery is always accepted

use std::sync::{Arc, Mutex};

use parley_core::{
    CryptoService, EntropyError, Environment, Establishment, ServiceConfig,
};
use proptest::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

#[derive(Clone)]
struct SeededEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SeededEnv {
    fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl Environment for SeededEnv {
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        self.rng.lock().unwrap().fill_bytes(buffer);
        Ok(())
    }

    fn wall_clock_secs(&self) -> u64 {
        0
    }
}

fn actor_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,15}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_establish_idempotent(a in actor_id(), b in actor_id(), seed in any::<u64>()) {
        let mut once = CryptoService::new(SeededEnv::new(seed));
        let mut twice = CryptoService::new(SeededEnv::new(seed));

        prop_assert_eq!(once.establish(&a, &b)?, Establishment::Created);
        twice.establish(&a, &b)?;
        prop_assert_eq!(twice.establish(&b, &a)?, Establishment::Existing);

        prop_assert_eq!(once.session_count(), twice.session_count());
        prop_assert_eq!(
            once.session(&a, &b).map(|s| s.secret().clone()),
            twice.session(&b, &a).map(|s| s.secret().clone())
        );
    }

    #[test]
    fn prop_roundtrip_with_lazy_bootstrap(
        a in actor_id(),
        b in actor_id(),
        messages in prop::collection::vec(".{0,64}", 1..8),
        seed in any::<u64>(),
    ) {
        prop_assume!(a != b);

        let mut sender = CryptoService::new(SeededEnv::new(seed));
        let mut receiver = CryptoService::new(SeededEnv::new(seed.wrapping_add(1)));

        for message in &messages {
            let envelope = sender.encrypt_for_peer(&a, &b, message)?;
            let decrypted = receiver.decrypt_from_peer(&b, &a, &envelope)?;
            prop_assert_eq!(&decrypted, message);
        }

        prop_assert_eq!(receiver.session_count(), 1);
        prop_assert_eq!(
            sender.session(&a, &b).map(|s| s.message_counter()),
            Some(messages.len() as u64)
        );
    }

    #[test]
    fn prop_either_side_may_encrypt_first(
        a in actor_id(),
        b in actor_id(),
        first_from_a in any::<bool>(),
        seed in any::<u64>(),
    ) {
        prop_assume!(a != b);

        let mut actor_a = CryptoService::new(SeededEnv::new(seed));
        let mut actor_b = CryptoService::new(SeededEnv::new(seed.wrapping_add(1)));

        if first_from_a {
            let envelope = actor_a.encrypt_for_peer(&a, &b, "ping")?;
            prop_assert_eq!(actor_b.decrypt_from_peer(&b, &a, &envelope)?, "ping");
            let reply = actor_b.encrypt_for_peer(&b, &a, "pong")?;
            prop_assert_eq!(actor_a.decrypt_from_peer(&a, &b, &reply)?, "pong");
        } else {
            let envelope = actor_b.encrypt_for_peer(&b, &a, "ping")?;
            prop_assert_eq!(actor_a.decrypt_from_peer(&a, &b, &envelope)?, "ping");
            let reply = actor_a.encrypt_for_peer(&a, &b, "pong")?;
            prop_assert_eq!(actor_b.decrypt_from_peer(&b, &a, &reply)?, "pong");
        }
    }

    #[test]
    fn prop_monotonic_accepts_in_order(
        count in 1usize..16,
        seed in any::<u64>(),
    ) {
        let mut sender =
            CryptoService::with_config(SeededEnv::new(seed), ServiceConfig::monotonic());
        let mut receiver =
            CryptoService::with_config(SeededEnv::new(seed ^ 0xFF), ServiceConfig::monotonic());

        for i in 0..count {
            let text = format!("message {i}");
            let envelope = sender.encrypt_for_peer("alice", "bob", &text)?;
            prop_assert_eq!(receiver.decrypt_from_peer("bob", "alice", &envelope)?, text);
        }

        let session = receiver.session("alice", "bob");
        prop_assert_eq!(session.and_then(|s| s.last_received("alice")), Some(count as u64));
    }
}
