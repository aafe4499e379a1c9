//! Room fan-out.
//!
//! When an actor joins a room, the relay creates a durable session record for
//! the joiner and every actor already present. Each pairing is handled on its
//! own: a failure for one peer is logged and reported, never propagated, and
//! the remaining peers are still processed. A peer whose record could not be
//! persisted falls back to lazy creation when the first envelope is relayed.
//!
//! Only persistence is retried. Derivation is a pure function and cannot fail.

use std::collections::BTreeSet;

use parley_core::Environment;
use parley_crypto::SessionId;
use parley_proto::ActorId;
use thiserror::Error;

use crate::storage::{SaveOutcome, Storage, StorageError, StoredSession};

/// Default number of persistence retries per peer.
pub const DEFAULT_PERSISTENCE_RETRIES: u32 = 2;

/// Why the session with one peer could not be ensured.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FanoutError {
    /// An actor id was empty
    #[error("actor id must not be empty")]
    EmptyActorId,

    /// Storage kept failing after all attempts
    #[error("persistence failed after {attempts} attempts: {source}")]
    Persistence {
        /// Attempts made, including the first
        attempts: u32,
        /// Last storage error
        #[source]
        source: StorageError,
    },
}

/// Whether a session had to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A new durable record was written
    Created,
    /// A record for (pair, room) already existed
    Existing,
}

/// Per-peer results of one fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    /// Peers a new record was created for
    pub created: Vec<ActorId>,
    /// Peers whose record already existed
    pub existing: Vec<ActorId>,
    /// Peers whose record could not be ensured
    pub failed: Vec<(ActorId, FanoutError)>,
}

impl FanoutReport {
    /// Whether every peer ended up with a record.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of peers processed.
    pub fn attempted(&self) -> usize {
        self.created.len() + self.existing.len() + self.failed.len()
    }
}

/// Drives session creation between a joining actor and the room's occupants.
pub struct RoomFanoutCoordinator<E: Environment, S: Storage> {
    env: E,
    storage: S,
    persistence_retries: u32,
}

impl<E: Environment, S: Storage> RoomFanoutCoordinator<E, S> {
    /// Create a coordinator with the default retry count.
    pub fn new(env: E, storage: S) -> Self {
        Self::with_retries(env, storage, DEFAULT_PERSISTENCE_RETRIES)
    }

    /// Create a coordinator retrying each persistence call up to
    /// `persistence_retries` extra times.
    pub fn with_retries(env: E, storage: S, persistence_retries: u32) -> Self {
        Self { env, storage, persistence_retries }
    }

    /// Storage the coordinator persists to.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Establish sessions between `actor_id` and every peer in `room_id`.
    ///
    /// `actor_id` itself and duplicate peers are skipped. Never fails: per-peer
    /// errors are logged and collected in the report.
    pub fn establish_pairwise_sessions<'a>(
        &self,
        actor_id: &str,
        room_id: &str,
        peers: impl IntoIterator<Item = &'a str>,
    ) -> FanoutReport {
        let peers: BTreeSet<&str> = peers.into_iter().filter(|p| *p != actor_id).collect();
        let mut report = FanoutReport::default();

        for peer in peers {
            match self.ensure_session(actor_id, peer, room_id) {
                Ok(SessionOutcome::Created) => report.created.push(peer.to_string()),
                Ok(SessionOutcome::Existing) => report.existing.push(peer.to_string()),
                Err(error) => {
                    tracing::warn!(
                        actor = actor_id,
                        peer,
                        room = room_id,
                        %error,
                        "session fan-out failed for peer"
                    );
                    report.failed.push((peer.to_string(), error));
                },
            }
        }

        tracing::debug!(
            actor = actor_id,
            room = room_id,
            created = report.created.len(),
            existing = report.existing.len(),
            failed = report.failed.len(),
            "session fan-out complete"
        );

        report
    }

    /// Ensure a durable record exists for (`actor_id`, `peer_id`) in
    /// `room_id`.
    ///
    /// Idempotent. A concurrent creator winning the insert counts as
    /// `Existing`.
    pub fn ensure_session(
        &self,
        actor_id: &str,
        peer_id: &str,
        room_id: &str,
    ) -> Result<SessionOutcome, FanoutError> {
        if actor_id.is_empty() || peer_id.is_empty() {
            return Err(FanoutError::EmptyActorId);
        }

        let session_id = SessionId::canonicalize(actor_id, peer_id);

        let existing = self.retry(|| self.storage.load_session_record(&session_id, room_id))?;
        if existing.is_some() {
            return Ok(SessionOutcome::Existing);
        }

        let record = StoredSession::derive(&session_id, room_id, self.env.wall_clock_secs());
        match self.retry(|| self.storage.save_session_record(&record))? {
            SaveOutcome::Created => {
                tracing::debug!(session = %session_id, room = room_id, "persisted session record");
                Ok(SessionOutcome::Created)
            },
            SaveOutcome::AlreadyExists => Ok(SessionOutcome::Existing),
        }
    }

    /// Run `op`, retrying transient storage failures.
    fn retry<T>(
        &self,
        mut op: impl FnMut() -> Result<T, StorageError>,
    ) -> Result<T, FanoutError> {
        let max_attempts = self.persistence_retries.saturating_add(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(source) if !source.is_transient() || attempts >= max_attempts => {
                    return Err(FanoutError::Persistence { attempts, source });
                },
                Err(source) => {
                    tracing::debug!(attempts, %source, "retrying session persistence");
                },
            }
        }
    }
}
