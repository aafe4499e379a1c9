//! Client error types.

use parley_core::SessionError;
use parley_proto::RoomId;
use thiserror::Error;

/// Errors returned by [`Client::handle`](crate::Client::handle).
///
/// Undecryptable envelopes are not errors: they surface as
/// [`ClientAction::UndecryptableMessage`](crate::ClientAction::UndecryptableMessage).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Session layer failure (key generation, nonce entropy, empty ids)
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Operation needs a room the client has not joined
    #[error("not joined to room {room_id}")]
    NotInRoom {
        /// Room that was named
        room_id: RoomId,
    },

    /// A message was addressed to the sending actor itself
    #[error("cannot send a message to yourself")]
    SelfAddressed,
}

impl ClientError {
    /// Returns true if the client's crypto can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Session(e) if e.is_fatal())
    }
}
