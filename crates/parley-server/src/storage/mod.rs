//! Storage abstraction for the relay
//!
//! Trait-based abstraction for persisting pairwise session records and
//! published key bundles. The trait is synchronous (no async): every call is
//! a single bounded operation.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;
use parley_crypto::{SessionId, derive_session_secret};
use parley_proto::{ActorId, KeyBundle, RoomId};
use serde::{Deserialize, Serialize};

pub use self::redb::RedbStorage;

/// Durable record of one pairwise session, scoped to a room.
///
/// The relay keys sessions by (sorted pair, room) while clients keep a single
/// room-agnostic record per pair. Both derive the same secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Canonical pair key, `first:second`
    pub session_key: String,
    /// Lexicographically smaller actor id
    pub user_id_1: ActorId,
    /// Lexicographically larger actor id
    pub user_id_2: ActorId,
    /// Room the session was created in
    pub room_id: RoomId,
    /// Base64 shared secret
    pub shared_secret: String,
    /// Envelopes relayed for this pair in this room
    pub message_counter: u64,
    /// Unix timestamp (seconds) when the record was created
    pub created_at_secs: u64,
}

impl StoredSession {
    /// Derive a fresh record for `session_id` in `room_id`.
    pub fn derive(session_id: &SessionId, room_id: &str, created_at_secs: u64) -> Self {
        Self {
            session_key: session_id.as_key(),
            user_id_1: session_id.first().to_string(),
            user_id_2: session_id.second().to_string(),
            room_id: room_id.to_string(),
            shared_secret: derive_session_secret(session_id).to_base64(),
            message_counter: 0,
            created_at_secs,
        }
    }

    /// Canonical session id of the pair.
    pub fn session_id(&self) -> SessionId {
        SessionId::canonicalize(&self.user_id_1, &self.user_id_2)
    }
}

/// Result of an atomic create-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was inserted
    Created,
    /// A record for the same (pair, room) already existed and was kept
    AlreadyExists,
}

/// Storage abstraction for session records and key bundles
///
/// Must be Clone (shared by the driver and the fan-out coordinator), Send +
/// Sync (thread-safe), and synchronous (no async methods). Implementations
/// typically share internal state via Arc, so clones access the same
/// underlying storage.
///
/// # Panics
///
/// Implementations may panic if internal synchronization primitives are
/// poisoned (a thread panicked while holding a lock). Acceptable for
/// test/simulation code, but production implementations should handle poisoned
/// mutexes gracefully.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Load the session record for a pair in a room.
    ///
    /// Returns `None` if no record exists.
    fn load_session_record(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<Option<StoredSession>, StorageError>;

    /// Insert a session record unless one exists for the same (pair, room).
    ///
    /// # Invariants
    ///
    /// - Create-if-absent is atomic per (pair, room)
    /// - An existing record is never overwritten; its counter is preserved
    fn save_session_record(&self, record: &StoredSession) -> Result<SaveOutcome, StorageError>;

    /// Increment the message counter of an existing record.
    ///
    /// Returns the new counter value.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` if no record exists for (pair, room)
    fn increment_message_counter(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<u64, StorageError>;

    /// All session records of a room, ordered by pair key.
    fn list_room_sessions(&self, room_id: &str) -> Result<Vec<StoredSession>, StorageError>;

    /// Load an actor's published key bundle.
    ///
    /// Returns `None` if the actor never published one.
    fn load_key_bundle(&self, actor_id: &str) -> Result<Option<KeyBundle>, StorageError>;

    /// Store an actor's published key bundle, replacing any previous one.
    fn save_key_bundle(&self, actor_id: &str, bundle: &KeyBundle) -> Result<(), StorageError>;
}
