#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use parley_crypto::SessionId;
use parley_proto::{ActorId, KeyBundle, RoomId};

use super::{SaveOutcome, Storage, StorageError, StoredSession};

/// In-memory storage implementation for testing and simulation
///
/// Sessions live in a `BTreeMap` keyed by (room, pair) so a room's records are
/// contiguous and listed in pair order. All state is wrapped in
/// Arc<Mutex<>> to allow Clone and concurrent access; the single lock makes
/// create-if-absent atomic. Uses `lock().expect()` which will panic if the
/// mutex is poisoned - acceptable for test code.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

struct MemoryStorageInner {
    /// (room id, sorted pair) -> record
    sessions: BTreeMap<(RoomId, SessionId), StoredSession>,

    /// Published key bundles per actor
    key_bundles: HashMap<ActorId, KeyBundle>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStorageInner {
                sessions: BTreeMap::new(),
                key_bundles: HashMap::new(),
            })),
        }
    }

    /// Total number of session records across all rooms.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn session_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").sessions.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn key(session_id: &SessionId, room_id: &str) -> (RoomId, SessionId) {
    (room_id.to_string(), session_id.clone())
}

impl Storage for MemoryStorage {
    #[allow(clippy::expect_used)]
    fn load_session_record(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<Option<StoredSession>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.sessions.get(&key(session_id, room_id)).cloned())
    }

    #[allow(clippy::expect_used)]
    fn save_session_record(&self, record: &StoredSession) -> Result<SaveOutcome, StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        let key = key(&record.session_id(), &record.room_id);

        if inner.sessions.contains_key(&key) {
            return Ok(SaveOutcome::AlreadyExists);
        }

        inner.sessions.insert(key, record.clone());
        Ok(SaveOutcome::Created)
    }

    #[allow(clippy::expect_used)]
    fn increment_message_counter(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let record = inner.sessions.get_mut(&key(session_id, room_id)).ok_or_else(|| {
            StorageError::NotFound { session: session_id.as_key(), room_id: room_id.to_string() }
        })?;

        record.message_counter = record.message_counter.saturating_add(1);
        Ok(record.message_counter)
    }

    #[allow(clippy::expect_used)]
    fn list_room_sessions(&self, room_id: &str) -> Result<Vec<StoredSession>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner
            .sessions
            .iter()
            .filter(|((room, _), _)| room == room_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    #[allow(clippy::expect_used)]
    fn load_key_bundle(&self, actor_id: &str) -> Result<Option<KeyBundle>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.key_bundles.get(actor_id).cloned())
    }

    #[allow(clippy::expect_used)]
    fn save_key_bundle(&self, actor_id: &str, bundle: &KeyBundle) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.key_bundles.insert(actor_id.to_string(), bundle.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(a: &str, b: &str, room: &str) -> StoredSession {
        StoredSession::derive(&SessionId::canonicalize(a, b), room, 100)
    }

    #[test]
    fn save_is_create_if_absent() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.save_session_record(&record("alice", "bob", "r1")), Ok(SaveOutcome::Created));
        storage.increment_message_counter(&SessionId::canonicalize("alice", "bob"), "r1").unwrap();

        assert_eq!(
            storage.save_session_record(&record("bob", "alice", "r1")),
            Ok(SaveOutcome::AlreadyExists)
        );
        let loaded = storage
            .load_session_record(&SessionId::canonicalize("bob", "alice"), "r1")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.message_counter, 1);
    }

    #[test]
    fn sessions_are_scoped_by_room() {
        let storage = MemoryStorage::new();
        storage.save_session_record(&record("alice", "bob", "r1")).unwrap();
        storage.save_session_record(&record("alice", "bob", "r2")).unwrap();

        assert_eq!(storage.session_count(), 2);
        assert_eq!(storage.list_room_sessions("r1").unwrap().len(), 1);
        assert!(storage.list_room_sessions("r3").unwrap().is_empty());
    }

    #[test]
    fn increment_missing_record_is_not_found() {
        let storage = MemoryStorage::new();
        let result = storage.increment_message_counter(&SessionId::canonicalize("a", "b"), "r1");

        assert_eq!(
            result,
            Err(StorageError::NotFound { session: "a:b".to_string(), room_id: "r1".to_string() })
        );
    }

    #[test]
    fn separator_in_actor_ids_keeps_pairs_apart() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.save_session_record(&record("a:b", "c", "r1")), Ok(SaveOutcome::Created));
        assert_eq!(storage.save_session_record(&record("a", "b:c", "r1")), Ok(SaveOutcome::Created));
        assert_eq!(storage.session_count(), 2);

        let loaded = storage
            .load_session_record(&SessionId::canonicalize("b:c", "a"), "r1")
            .unwrap()
            .unwrap();
        assert_eq!((loaded.user_id_1.as_str(), loaded.user_id_2.as_str()), ("a", "b:c"));
    }

    #[test]
    fn key_bundle_overwrites() {
        let storage = MemoryStorage::new();
        let mut bundle = KeyBundle {
            identity_key: "one".to_string(),
            signed_pre_key: "spk".to_string(),
            one_time_pre_keys: vec![],
            registration_id: "7".to_string(),
        };
        storage.save_key_bundle("alice", &bundle).unwrap();
        bundle.identity_key = "two".to_string();
        storage.save_key_bundle("alice", &bundle).unwrap();

        assert_eq!(storage.load_key_bundle("alice").unwrap(), Some(bundle));
        assert_eq!(storage.load_key_bundle("bob").unwrap(), None);
    }
}
