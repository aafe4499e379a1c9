//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety.
//! Session records and key bundles survive relay restarts.

use std::{path::Path, sync::Arc};

use parley_crypto::SessionId;
use parley_proto::KeyBundle;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use super::{SaveOutcome, Storage, StorageError, StoredSession};

/// Table: sessions
/// Key: room prefix (u32 BE length + room id) + u32 BE length + first actor +
/// second actor
/// Value: CBOR-encoded StoredSession
const SESSIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("sessions");

/// Table: key_bundles
/// Key: actor id bytes
/// Value: CBOR-encoded KeyBundle
const KEY_BUNDLES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("key_bundles");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Write transactions are
/// serialized, which makes create-if-absent atomic per (pair, room). Clone is
/// cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist (SESSIONS, KEY_BUNDLES).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;
            let _ = txn.open_table(KEY_BUNDLES).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Storage for RedbStorage {
    fn load_session_record(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<Option<StoredSession>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;

        let key = encode_session_key(room_id, session_id);
        let value = table.get(key.as_slice()).map_err(|e| StorageError::Io(e.to_string()))?;

        value.map(|v| decode(v.value())).transpose()
    }

    fn save_session_record(&self, record: &StoredSession) -> Result<SaveOutcome, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table =
                txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;

            let key = encode_session_key(&record.room_id, &record.session_id());
            let exists = table
                .get(key.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?
                .is_some();

            if exists {
                return Ok(SaveOutcome::AlreadyExists);
            }

            let bytes = encode(record)?;
            table
                .insert(key.as_slice(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(SaveOutcome::Created)
    }

    fn increment_message_counter(
        &self,
        session_id: &SessionId,
        room_id: &str,
    ) -> Result<u64, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let counter = {
            let mut table =
                txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;

            let key = encode_session_key(room_id, session_id);
            let existing: Option<StoredSession> = table
                .get(key.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?
                .map(|v| decode(v.value()))
                .transpose()?;

            let mut record = existing.ok_or_else(|| StorageError::NotFound {
                session: session_id.as_key(),
                room_id: room_id.to_string(),
            })?;
            record.message_counter = record.message_counter.saturating_add(1);

            let bytes = encode(&record)?;
            table
                .insert(key.as_slice(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;

            record.message_counter
        };

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(counter)
    }

    fn list_room_sessions(&self, room_id: &str) -> Result<Vec<StoredSession>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(SESSIONS).map_err(|e| StorageError::Io(e.to_string()))?;

        let prefix = encode_room_prefix(room_id);
        let results =
            table.range(prefix.as_slice()..).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut records = Vec::new();
        for result in results {
            let (key, value) = result.map_err(|e| StorageError::Io(e.to_string()))?;

            if !key.value().starts_with(&prefix) {
                break;
            }

            records.push(decode(value.value())?);
        }

        records.sort_by(|a: &StoredSession, b| a.session_key.cmp(&b.session_key));
        Ok(records)
    }

    fn load_key_bundle(&self, actor_id: &str) -> Result<Option<KeyBundle>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(KEY_BUNDLES).map_err(|e| StorageError::Io(e.to_string()))?;

        let value =
            table.get(actor_id.as_bytes()).map_err(|e| StorageError::Io(e.to_string()))?;

        value.map(|v| decode(v.value())).transpose()
    }

    fn save_key_bundle(&self, actor_id: &str, bundle: &KeyBundle) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table =
                txn.open_table(KEY_BUNDLES).map_err(|e| StorageError::Io(e.to_string()))?;

            let bytes = encode(bundle)?;
            table
                .insert(actor_id.as_bytes(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Length-prefixed room id. Every session key of the room starts with it.
fn encode_room_prefix(room_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + room_id.len());
    key.extend_from_slice(&(room_id.len() as u32).to_be_bytes());
    key.extend_from_slice(room_id.as_bytes());
    key
}

/// Session key: room prefix, then the sorted pair with the first actor
/// length-prefixed so ids containing the separator stay unambiguous.
fn encode_session_key(room_id: &str, session_id: &SessionId) -> Vec<u8> {
    let first = session_id.first().as_bytes();
    let second = session_id.second().as_bytes();

    let mut key = encode_room_prefix(room_id);
    key.reserve(4 + first.len() + second.len());
    key.extend_from_slice(&(first.len() as u32).to_be_bytes());
    key.extend_from_slice(first);
    key.extend_from_slice(second);
    key
}
