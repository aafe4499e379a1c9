//! Session layer configuration.

use parley_crypto::{DEFAULT_ONE_TIME_PRE_KEYS, HeaderBinding};

/// How message numbers on received envelopes are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayPolicy {
    /// Numbers are display metadata only. Any number is accepted.
    #[default]
    Advisory,

    /// Numbers must strictly increase per (session, sender). A replayed or
    /// out-of-order envelope is rejected before decryption.
    ///
    /// Envelopes are sealed with their header bound as associated data, so a
    /// captured envelope resent under a larger number fails authentication.
    /// Both peers must run this policy; an unbound envelope is rejected.
    Monotonic,
}

impl ReplayPolicy {
    /// Header binding used for envelopes sealed and opened under this policy.
    pub fn header_binding(self) -> HeaderBinding {
        match self {
            Self::Advisory => HeaderBinding::Unbound,
            Self::Monotonic => HeaderBinding::Bound,
        }
    }
}

/// Configuration for a [`CryptoService`](crate::CryptoService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Treatment of incoming message numbers
    pub replay_policy: ReplayPolicy,

    /// One-time pre-keys per generated bundle
    pub one_time_pre_key_count: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            replay_policy: ReplayPolicy::Advisory,
            one_time_pre_key_count: DEFAULT_ONE_TIME_PRE_KEYS,
        }
    }
}

impl ServiceConfig {
    /// Hardened configuration rejecting replayed message numbers.
    pub fn monotonic() -> Self {
        Self { replay_policy: ReplayPolicy::Monotonic, ..Self::default() }
    }
}
