//! Per-actor session store.
//!
//! Maps canonical session ids to derived secrets. Each actor holds its own
//! store; consistency across actors comes only from derivation being a pure
//! function of the pair.

use std::collections::HashMap;

use parley_crypto::{SessionId, SessionSecret};
use parley_proto::ActorId;

/// One established pairwise session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    session_id: SessionId,
    secret: SessionSecret,
    message_counter: u64,
    last_received: HashMap<ActorId, u64>,
}

impl SessionRecord {
    /// Fresh record with a zero counter.
    pub fn new(session_id: SessionId, secret: SessionSecret) -> Self {
        Self { session_id, secret, message_counter: 0, last_received: HashMap::new() }
    }

    /// Canonical session id.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Shared secret.
    pub fn secret(&self) -> &SessionSecret {
        &self.secret
    }

    /// Number of envelopes this actor has encrypted in the session.
    pub fn message_counter(&self) -> u64 {
        self.message_counter
    }

    /// Advance the send counter and return the new value.
    pub fn next_message_number(&mut self) -> u64 {
        self.message_counter = self.message_counter.saturating_add(1);
        self.message_counter
    }

    /// Highest message number accepted from `sender_id`.
    pub fn last_received(&self, sender_id: &str) -> Option<u64> {
        self.last_received.get(sender_id).copied()
    }

    /// Record an accepted message number from `sender_id`.
    pub fn record_received(&mut self, sender_id: &str, number: u64) {
        let entry = self.last_received.entry(sender_id.to_string()).or_insert(0);
        *entry = (*entry).max(number);
    }
}

/// Sessions keyed by canonical session id.
///
/// Room-agnostic: one record per unordered pair regardless of how many rooms
/// the pair shares.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, SessionRecord>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless one already exists for its session id.
    ///
    /// Returns `true` if inserted. An existing record is left untouched so
    /// counters survive redundant establishment.
    pub fn insert_if_absent(&mut self, record: SessionRecord) -> bool {
        if self.sessions.contains_key(record.session_id()) {
            return false;
        }
        self.sessions.insert(record.session_id().clone(), record);
        true
    }

    /// Record for `session_id`.
    pub fn get(&self, session_id: &SessionId) -> Option<&SessionRecord> {
        self.sessions.get(session_id)
    }

    /// Mutable record for `session_id`.
    pub fn get_mut(&mut self, session_id: &SessionId) -> Option<&mut SessionRecord> {
        self.sessions.get_mut(session_id)
    }

    /// Whether a record exists for `session_id`.
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = &SessionRecord> {
        self.sessions.values()
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
