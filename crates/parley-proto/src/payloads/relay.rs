//! Relay requests and relay messages.

use serde::{Deserialize, Serialize};

use super::{ActorId, EncryptedEnvelope, KeyBundle, RoomId, from_cbor, to_cbor};
use crate::errors::Result;

/// Upper bound on an encoded relay request or message (2 MiB).
pub const MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;

/// Requests a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayRequest {
    /// Join a room
    JoinRoom {
        /// Room to join
        room_id: RoomId,
        /// Joining actor
        actor_id: ActorId,
    },

    /// Leave a room
    LeaveRoom {
        /// Room to leave
        room_id: RoomId,
        /// Leaving actor
        actor_id: ActorId,
    },

    /// Publish the actor's public key bundle
    InitializeCrypto {
        /// Publishing actor
        actor_id: ActorId,
        /// Public key bundle
        bundle: KeyBundle,
    },

    /// Ask for another actor's published key bundle
    GetUserKeys {
        /// Actor whose bundle is requested
        actor_id: ActorId,
    },

    /// Relay an encrypted envelope to a room
    SendEncrypted {
        /// Room the envelope is sent in
        room_id: RoomId,
        /// The envelope itself (opaque to the relay)
        envelope: EncryptedEnvelope,
    },
}

/// Presence notification for one actor in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    /// Actor the notification is about
    pub actor_id: ActorId,
    /// Room the actor is present in
    pub room_id: RoomId,
    /// The actor's published bundle, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<KeyBundle>,
}

/// Error payload sent back to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error code identifying the type of error
    pub code: u16,
    /// Human-readable message
    pub message: String,
}

impl ErrorPayload {
    /// Request was rejected.
    pub const REQUEST_REJECTED: u16 = 0x0001;
    /// Room is full.
    pub const ROOM_FULL: u16 = 0x0002;
    /// Storage operation failed.
    pub const STORAGE_ERROR: u16 = 0x0003;
    /// Actor has not joined the room.
    pub const NOT_IN_ROOM: u16 = 0x0004;

    /// Create a request rejection error.
    pub fn request_rejected(reason: impl Into<String>) -> Self {
        Self { code: Self::REQUEST_REJECTED, message: reason.into() }
    }

    /// Create a room full error.
    pub fn room_full(room_id: &str, limit: usize) -> Self {
        Self { code: Self::ROOM_FULL, message: format!("room {room_id} is full ({limit} members)") }
    }

    /// Create a storage error.
    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self { code: Self::STORAGE_ERROR, message: msg.into() }
    }

    /// Create a not-in-room error.
    pub fn not_in_room(actor_id: &str, room_id: &str) -> Self {
        Self { code: Self::NOT_IN_ROOM, message: format!("{actor_id} has not joined {room_id}") }
    }
}

/// Messages the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayMessage {
    /// Another actor joined a room we are in
    UserJoined {
        /// Who joined, and where
        presence: PresencePayload,
    },

    /// An actor was already present when we joined
    UserAlreadyInRoom {
        /// Who is present, and where
        presence: PresencePayload,
    },

    /// An actor left a room we are in
    UserLeft {
        /// Actor that left
        actor_id: ActorId,
        /// Room it left
        room_id: RoomId,
    },

    /// An encrypted envelope was relayed in a room we are in
    EncryptedMessageReceived {
        /// Room the envelope was sent in
        room_id: RoomId,
        /// The relayed envelope
        envelope: EncryptedEnvelope,
    },

    /// Answer to [`RelayRequest::GetUserKeys`]
    UserKeysResponse {
        /// Actor the bundle belongs to
        actor_id: ActorId,
        /// Published bundle, `None` if the actor never published one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bundle: Option<KeyBundle>,
    },

    /// Answer to [`RelayRequest::InitializeCrypto`]
    CryptoInitialized {
        /// Whether the bundle was stored
        success: bool,
        /// Failure detail
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Error response
    Error {
        /// Error detail
        error: ErrorPayload,
    },
}

impl RelayRequest {
    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Decode from CBOR, rejecting inputs above [`MAX_MESSAGE_SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes, MAX_MESSAGE_SIZE)
    }

    /// Event name on the wire.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::InitializeCrypto { .. } => "initialize_crypto",
            Self::GetUserKeys { .. } => "get_user_keys",
            Self::SendEncrypted { .. } => "send_encrypted",
        }
    }
}

impl RelayMessage {
    /// Encode to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Decode from CBOR, rejecting inputs above [`MAX_MESSAGE_SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes, MAX_MESSAGE_SIZE)
    }

    /// Shorthand for an error message.
    pub fn error(error: ErrorPayload) -> Self {
        Self::Error { error }
    }
}
