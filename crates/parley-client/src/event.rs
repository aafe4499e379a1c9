//! Client events and actions.

use parley_core::SessionError;
use parley_crypto::DecryptionError;
use parley_proto::{ActorId, ErrorPayload, KeyBundle, RelayMessage, RelayRequest, RoomId};

/// Text shown in place of a message that failed to decrypt.
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[undecryptable message]";

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving relay messages from the network
/// - Forwarding application intents (join, send, leave)
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Generate keys if none exist and publish the public bundle.
    InitializeCrypto,

    /// Application wants to join a room.
    JoinRoom {
        /// Room to join.
        room_id: RoomId,
    },

    /// Application wants to leave a room.
    LeaveRoom {
        /// Room to leave.
        room_id: RoomId,
    },

    /// Application wants to send a message to one peer.
    SendMessage {
        /// Room the message is sent in.
        room_id: RoomId,
        /// Peer the message is encrypted for.
        recipient_id: ActorId,
        /// Message text.
        plaintext: String,
    },

    /// Application wants to send a message to every online peer of a room.
    ///
    /// One envelope per peer, each under that pair's session.
    BroadcastMessage {
        /// Target room.
        room_id: RoomId,
        /// Message text.
        plaintext: String,
    },

    /// Ask the relay for a peer's published bundle.
    FetchPeerKeys {
        /// Peer whose bundle is requested.
        actor_id: ActorId,
    },

    /// Message received from the relay.
    RelayMessageReceived(RelayMessage),
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send a request to the relay.
    Send(RelayRequest),

    /// Deliver decrypted message to application layer.
    DeliverMessage {
        /// Room the message arrived in.
        room_id: RoomId,
        /// Sending actor.
        sender_id: ActorId,
        /// Decrypted text.
        plaintext: String,
        /// Sender's advisory message number.
        message_number: String,
    },

    /// A broadcast could not be encrypted for one peer. Envelopes for the
    /// other peers are still sent.
    SendFailed {
        /// Room of the broadcast.
        room_id: RoomId,
        /// Peer that was skipped.
        recipient_id: ActorId,
        /// Why encryption failed.
        reason: SessionError,
    },

    /// An envelope addressed to us could not be decrypted.
    ///
    /// The application shows [`UNDECRYPTABLE_PLACEHOLDER`] instead of the
    /// message.
    UndecryptableMessage {
        /// Room the envelope arrived in.
        room_id: RoomId,
        /// Claimed sender.
        sender_id: ActorId,
        /// Why decryption failed.
        reason: DecryptionError,
    },

    /// A peer is now present in a room and a session with it exists.
    PeerOnline {
        /// Room the peer is in.
        room_id: RoomId,
        /// The peer.
        actor_id: ActorId,
    },

    /// A peer left a room.
    PeerOffline {
        /// Room the peer left.
        room_id: RoomId,
        /// The peer.
        actor_id: ActorId,
    },

    /// The relay answered our bundle publication.
    CryptoInitialized {
        /// Whether the relay stored the bundle.
        success: bool,
        /// Failure detail from the relay.
        message: Option<String>,
    },

    /// A peer's published bundle arrived.
    PeerKeys {
        /// The peer.
        actor_id: ActorId,
        /// Its bundle, `None` if never published.
        bundle: Option<KeyBundle>,
    },

    /// The relay reported an error.
    RelayError(ErrorPayload),

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}
