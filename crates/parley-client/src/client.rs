//! Client state machine.
//!
//! The `Client` tracks room memberships and online peers for one actor and
//! owns that actor's [`CryptoService`]. Sessions are established as soon as a
//! peer is seen in a shared room, and lazily on first send or receive
//! otherwise.

use std::collections::{BTreeSet, HashMap};

use parley_core::{CryptoService, Environment, ServiceConfig};
use parley_proto::{ActorId, EncryptedEnvelope, PresencePayload, RelayMessage, RelayRequest, RoomId};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent},
};

/// Client for one actor talking to a Parley relay.
pub struct Client<E: Environment> {
    /// Actor this client acts as.
    actor_id: ActorId,

    /// Keys and pairwise sessions.
    crypto: CryptoService<E>,

    /// Joined rooms and the peers currently online in each.
    rooms: HashMap<RoomId, BTreeSet<ActorId>>,

    /// Whether the relay acknowledged our bundle.
    published: bool,
}

impl<E: Environment> Client<E> {
    /// Create a client for `actor_id` with the default session config.
    pub fn new(env: E, actor_id: impl Into<ActorId>) -> Self {
        Self::with_config(env, actor_id, ServiceConfig::default())
    }

    /// Create a client for `actor_id` with an explicit session config.
    pub fn with_config(env: E, actor_id: impl Into<ActorId>, config: ServiceConfig) -> Self {
        Self {
            actor_id: actor_id.into(),
            crypto: CryptoService::with_config(env, config),
            rooms: HashMap::new(),
            published: false,
        }
    }

    /// Actor this client acts as.
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Session layer owned by this client.
    pub fn crypto(&self) -> &CryptoService<E> {
        &self.crypto
    }

    /// Whether the relay acknowledged our published bundle.
    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Number of joined rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Check if the client has joined a room.
    pub fn is_member(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Peers currently online in `room_id`, in order.
    pub fn online_peers(&self, room_id: &str) -> Vec<ActorId> {
        self.rooms.get(room_id).map(|p| p.iter().cloned().collect()).unwrap_or_default()
    }

    /// Process an event and return the resulting actions.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` for failed intents. Relay traffic that cannot be
    /// used (foreign envelopes, undecryptable messages) never errors.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::InitializeCrypto => self.handle_initialize_crypto(),
            ClientEvent::JoinRoom { room_id } => Ok(self.handle_join_room(room_id)),
            ClientEvent::LeaveRoom { room_id } => self.handle_leave_room(room_id),
            ClientEvent::SendMessage { room_id, recipient_id, plaintext } => {
                self.handle_send_message(&room_id, &recipient_id, &plaintext)
            },
            ClientEvent::BroadcastMessage { room_id, plaintext } => {
                self.handle_broadcast_message(&room_id, &plaintext)
            },
            ClientEvent::FetchPeerKeys { actor_id } => {
                Ok(vec![ClientAction::Send(RelayRequest::GetUserKeys { actor_id })])
            },
            ClientEvent::RelayMessageReceived(message) => Ok(self.handle_relay_message(message)),
        }
    }

    fn handle_initialize_crypto(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let bundle = self.crypto.ensure_keys(&self.actor_id)?;

        Ok(vec![ClientAction::Send(RelayRequest::InitializeCrypto {
            actor_id: self.actor_id.clone(),
            bundle,
        })])
    }

    fn handle_join_room(&mut self, room_id: RoomId) -> Vec<ClientAction> {
        self.rooms.entry(room_id.clone()).or_default();

        vec![ClientAction::Send(RelayRequest::JoinRoom {
            room_id,
            actor_id: self.actor_id.clone(),
        })]
    }

    fn handle_leave_room(&mut self, room_id: RoomId) -> Result<Vec<ClientAction>, ClientError> {
        if self.rooms.remove(&room_id).is_none() {
            return Err(ClientError::NotInRoom { room_id });
        }

        Ok(vec![ClientAction::Send(RelayRequest::LeaveRoom {
            room_id,
            actor_id: self.actor_id.clone(),
        })])
    }

    fn handle_send_message(
        &mut self,
        room_id: &str,
        recipient_id: &str,
        plaintext: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.rooms.contains_key(room_id) {
            return Err(ClientError::NotInRoom { room_id: room_id.to_string() });
        }
        if recipient_id == self.actor_id {
            return Err(ClientError::SelfAddressed);
        }

        let envelope = self.crypto.encrypt_for_peer(&self.actor_id, recipient_id, plaintext)?;

        Ok(vec![ClientAction::Send(RelayRequest::SendEncrypted {
            room_id: room_id.to_string(),
            envelope,
        })])
    }

    fn handle_broadcast_message(
        &mut self,
        room_id: &str,
        plaintext: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let Some(peers) = self.rooms.get(room_id) else {
            return Err(ClientError::NotInRoom { room_id: room_id.to_string() });
        };

        let peers: Vec<ActorId> = peers.iter().cloned().collect();
        let mut actions = Vec::with_capacity(peers.len());
        for peer in peers {
            match self.crypto.encrypt_for_peer(&self.actor_id, &peer, plaintext) {
                Ok(envelope) => actions.push(ClientAction::Send(RelayRequest::SendEncrypted {
                    room_id: room_id.to_string(),
                    envelope,
                })),
                Err(reason) => {
                    tracing::warn!(
                        room = room_id,
                        peer = %peer,
                        error = %reason,
                        "broadcast skipped peer"
                    );
                    actions.push(ClientAction::SendFailed {
                        room_id: room_id.to_string(),
                        recipient_id: peer,
                        reason,
                    });
                },
            }
        }

        if actions.is_empty() {
            actions.push(ClientAction::Log { message: format!("no peers online in {room_id}") });
        }

        Ok(actions)
    }

    fn handle_relay_message(&mut self, message: RelayMessage) -> Vec<ClientAction> {
        match message {
            RelayMessage::UserJoined { presence } | RelayMessage::UserAlreadyInRoom { presence } => {
                self.handle_presence(presence)
            },
            RelayMessage::UserLeft { actor_id, room_id } => {
                let removed = self.rooms.get_mut(&room_id).is_some_and(|p| p.remove(&actor_id));
                if removed {
                    vec![ClientAction::PeerOffline { room_id, actor_id }]
                } else {
                    Vec::new()
                }
            },
            RelayMessage::EncryptedMessageReceived { room_id, envelope } => {
                self.handle_envelope(room_id, &envelope)
            },
            RelayMessage::UserKeysResponse { actor_id, bundle } => {
                if let Some(bundle) = &bundle {
                    self.crypto.import_public_bundle(&actor_id, bundle.clone());
                }
                vec![ClientAction::PeerKeys { actor_id, bundle }]
            },
            RelayMessage::CryptoInitialized { success, message } => {
                self.published = success;
                vec![ClientAction::CryptoInitialized { success, message }]
            },
            RelayMessage::Error { error } => vec![ClientAction::RelayError(error)],
        }
    }

    fn handle_presence(&mut self, presence: PresencePayload) -> Vec<ClientAction> {
        let PresencePayload { actor_id, room_id, bundle } = presence;

        if actor_id == self.actor_id {
            return Vec::new();
        }
        let Some(peers) = self.rooms.get_mut(&room_id) else {
            return vec![ClientAction::Log {
                message: format!("presence for {actor_id} in unjoined room {room_id}"),
            }];
        };
        peers.insert(actor_id.clone());

        if let Some(bundle) = bundle {
            self.crypto.import_public_bundle(&actor_id, bundle);
        }

        match self.crypto.establish(&self.actor_id, &actor_id) {
            Ok(_) => vec![ClientAction::PeerOnline { room_id, actor_id }],
            Err(e) => vec![ClientAction::Log {
                message: format!("no session with {actor_id:?}: {e}"),
            }],
        }
    }

    fn handle_envelope(&mut self, room_id: RoomId, envelope: &EncryptedEnvelope) -> Vec<ClientAction> {
        // The relay fans envelopes out to the whole room
        if envelope.recipient_key_id != self.actor_id || envelope.sender_key_id == self.actor_id {
            return Vec::new();
        }

        let sender_id = envelope.sender_key_id.clone();
        match self.crypto.decrypt_from_peer(&self.actor_id, &sender_id, envelope) {
            Ok(plaintext) => vec![ClientAction::DeliverMessage {
                room_id,
                sender_id,
                plaintext,
                message_number: envelope.message_number.clone(),
            }],
            Err(reason) => {
                tracing::debug!(sender = %sender_id, error = %reason, "undecryptable envelope");
                vec![ClientAction::UndecryptableMessage { room_id, sender_id, reason }]
            },
        }
    }
}
