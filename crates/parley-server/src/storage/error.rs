//! Storage error types.

use thiserror::Error;

/// Errors returned by a [`Storage`](super::Storage) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Backend I/O failed (disk, transaction, injected fault).
    ///
    /// Transient: the operation may succeed on retry.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored value could not be encoded or decoded.
    ///
    /// Not transient: retrying the same value fails the same way.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The record to update does not exist
    #[error("no session record for {session} in room {room_id}")]
    NotFound {
        /// Pair key of the missing record
        session: String,
        /// Room the record was looked up in
        room_id: String,
    },
}

impl StorageError {
    /// Returns true if the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
