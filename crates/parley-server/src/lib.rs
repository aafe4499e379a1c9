//! Parley relay.
//!
//! Relay-side half of the pairwise session layer. The relay never decrypts:
//! it tracks who is present in which room, creates a durable session record
//! for every pair of occupants when someone joins, stores published key
//! bundles, and forwards envelopes while counting them per session.
//!
//! # Components
//!
//! - [`RelayDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`RoomFanoutCoordinator`]: Per-peer session creation on join
//! - [`PresenceRegistry`]: Room membership in both directions
//! - [`Storage`]: Durable records ([`MemoryStorage`], [`RedbStorage`],
//!   [`ChaoticStorage`])
//! - [`SystemEnv`]: Production environment (real time, crypto RNG)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod error;
pub mod fanout;
mod registry;
pub mod storage;
mod system_env;

pub use driver::{LogLevel, RelayAction, RelayConfig, RelayDriver, RelayEvent};
pub use error::RelayError;
pub use fanout::{FanoutError, FanoutReport, RoomFanoutCoordinator, SessionOutcome};
pub use registry::PresenceRegistry;
pub use storage::{
    ChaoticStorage, MemoryStorage, RedbStorage, SaveOutcome, Storage, StorageError, StoredSession,
};
pub use system_env::SystemEnv;

/// Forward a [`RelayAction::Log`] to `tracing`. Other actions are ignored.
pub fn trace_action(action: &RelayAction) {
    if let RelayAction::Log { level, message, timestamp } = action {
        match level {
            LogLevel::Debug => tracing::debug!(timestamp, "{message}"),
            LogLevel::Info => tracing::info!(timestamp, "{message}"),
            LogLevel::Warn => tracing::warn!(timestamp, "{message}"),
            LogLevel::Error => tracing::error!(timestamp, "{message}"),
        }
    }
}
