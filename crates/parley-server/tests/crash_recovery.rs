//! Crash recovery tests for `RedbStorage`.
//!
//! Session records and key bundles must survive close/reopen cycles,
//! simulating relay restarts.

use parley_crypto::{SessionId, SessionSecret, derive_session_secret};
use parley_proto::KeyBundle;
use parley_server::storage::{RedbStorage, SaveOutcome, Storage, StoredSession};
use tempfile::tempdir;

fn bundle(identity: &str) -> KeyBundle {
    KeyBundle {
        identity_key: identity.to_string(),
        signed_pre_key: "spk".to_string(),
        one_time_pre_keys: (0..10).map(|i| format!("otpk-{i}")).collect(),
        registration_id: "4242".to_string(),
    }
}

#[test]
fn test_sessions_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("relay.redb");
    let pair = SessionId::canonicalize("bob", "alice");

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        let record = StoredSession::derive(&pair, "r1", 1_700_000_000);
        assert_eq!(storage.save_session_record(&record).unwrap(), SaveOutcome::Created);

        for _ in 0..3 {
            storage.increment_message_counter(&pair, "r1").unwrap();
        }
    }

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        let loaded = storage.load_session_record(&pair, "r1").unwrap().unwrap();

        assert_eq!(loaded.session_key, "alice:bob");
        assert_eq!(loaded.user_id_1, "alice");
        assert_eq!(loaded.user_id_2, "bob");
        assert_eq!(loaded.message_counter, 3);
        assert_eq!(loaded.created_at_secs, 1_700_000_000);
        assert_eq!(
            SessionSecret::from_base64(&loaded.shared_secret),
            Some(derive_session_secret(&pair))
        );
    }
}

#[test]
fn test_duplicate_insert_after_restart_keeps_counter() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("relay.redb");
    let pair = SessionId::canonicalize("alice", "bob");

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        storage.save_session_record(&StoredSession::derive(&pair, "r1", 1)).unwrap();
        storage.increment_message_counter(&pair, "r1").unwrap();
    }

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        let again = StoredSession::derive(&pair, "r1", 2);

        assert_eq!(storage.save_session_record(&again).unwrap(), SaveOutcome::AlreadyExists);
        let loaded = storage.load_session_record(&pair, "r1").unwrap().unwrap();
        assert_eq!(loaded.message_counter, 1);
        assert_eq!(loaded.created_at_secs, 1);
    }
}

#[test]
fn test_key_bundles_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("relay.redb");

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        storage.save_key_bundle("alice", &bundle("first")).unwrap();
        storage.save_key_bundle("alice", &bundle("second")).unwrap();
    }

    {
        let storage = RedbStorage::open(&db_path).unwrap();
        assert_eq!(storage.load_key_bundle("alice").unwrap(), Some(bundle("second")));
        assert_eq!(storage.load_key_bundle("bob").unwrap(), None);
    }
}

#[test]
fn test_room_listing_is_scoped_and_ordered() {
    let dir = tempdir().unwrap();
    let storage = RedbStorage::open(dir.path().join("relay.redb")).unwrap();

    for (a, b, room) in
        [("carol", "alice", "r1"), ("bob", "alice", "r1"), ("alice", "bob", "r10"), ("x", "y", "r2")]
    {
        storage
            .save_session_record(&StoredSession::derive(&SessionId::canonicalize(a, b), room, 0))
            .unwrap();
    }

    let keys: Vec<String> =
        storage.list_room_sessions("r1").unwrap().into_iter().map(|s| s.session_key).collect();
    assert_eq!(keys, vec!["alice:bob".to_string(), "alice:carol".to_string()]);

    assert_eq!(storage.list_room_sessions("r10").unwrap().len(), 1);
    assert!(storage.list_room_sessions("missing").unwrap().is_empty());
}

#[test]
fn test_increment_missing_is_not_found() {
    let dir = tempdir().unwrap();
    let storage = RedbStorage::open(dir.path().join("relay.redb")).unwrap();

    let result = storage.increment_message_counter(&SessionId::canonicalize("a", "b"), "r1");
    assert!(matches!(result, Err(parley_server::StorageError::NotFound { .. })));
}
