//! Relay driver.
//!
//! Ties together the presence registry, room fan-out and storage. Sans-IO:
//! the runtime feeds [`RelayEvent`]s in and executes the returned
//! [`RelayAction`]s. The driver never touches a socket.

use parley_core::Environment;
use parley_crypto::SessionId;
use parley_proto::{
    ActorId, EncryptedEnvelope, ErrorPayload, PresencePayload, RelayMessage, RelayRequest, RoomId,
};

use crate::{
    error::RelayError,
    fanout::{DEFAULT_PERSISTENCE_RETRIES, RoomFanoutCoordinator},
    registry::PresenceRegistry,
    storage::{Storage, StorageError, StoredSession},
};

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum actors present in one room
    pub max_room_size: usize,
    /// Extra attempts per persistence call during fan-out
    pub persistence_retries: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { max_room_size: 256, persistence_retries: DEFAULT_PERSISTENCE_RETRIES }
    }
}

/// Events that the relay driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A decoded request arrived from an actor's connection
    RequestReceived {
        /// Actor the connection is authenticated as
        from: ActorId,
        /// The request
        request: RelayRequest,
    },

    /// Raw CBOR bytes arrived from an actor's connection
    BytesReceived {
        /// Actor the connection is authenticated as
        from: ActorId,
        /// Encoded [`RelayRequest`]
        bytes: Vec<u8>,
    },

    /// An actor's connection closed
    Disconnected {
        /// Actor that went away
        actor_id: ActorId,
    },
}

/// Actions that the relay driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction {
    /// Send a message to one actor
    SendToActor {
        /// Target actor
        actor_id: ActorId,
        /// Message to send
        message: RelayMessage,
    },

    /// Send a message to every actor present in a room
    BroadcastToRoom {
        /// Target room
        room_id: RoomId,
        /// Message to broadcast
        message: RelayMessage,
        /// Actor to leave out of the broadcast
        exclude: Option<ActorId>,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
        /// Unix timestamp (seconds) when the event occurred
        timestamp: u64,
    },
}

/// Log levels for relay actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

/// Action-based relay driver.
///
/// Orchestrates presence, fan-out on join, key bundle publication and
/// envelope routing.
pub struct RelayDriver<E, S>
where
    E: Environment,
    S: Storage,
{
    /// Room presence
    registry: PresenceRegistry,
    /// Session creation on join
    fanout: RoomFanoutCoordinator<E, S>,
    /// Storage backend
    storage: S,
    /// Environment (time, RNG)
    env: E,
    /// Relay configuration
    config: RelayConfig,
}

impl<E, S> RelayDriver<E, S>
where
    E: Environment,
    S: Storage,
{
    /// Create a new relay driver.
    pub fn new(env: E, storage: S, config: RelayConfig) -> Self {
        let fanout = RoomFanoutCoordinator::with_retries(
            env.clone(),
            storage.clone(),
            config.persistence_retries,
        );
        Self { registry: PresenceRegistry::new(), fanout, storage, env, config }
    }

    /// Presence registry.
    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// Storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Durable session records of a room.
    pub fn room_sessions(&self, room_id: &str) -> Result<Vec<StoredSession>, RelayError> {
        Ok(self.storage.list_room_sessions(room_id)?)
    }

    /// Process a relay event and return actions to execute.
    ///
    /// # Errors
    ///
    /// - `RelayError::Protocol` if raw bytes do not decode to a request
    /// - `RelayError::EmptyActorId` if the event names no actor
    pub fn process_event(&mut self, event: RelayEvent) -> Result<Vec<RelayAction>, RelayError> {
        match event {
            RelayEvent::RequestReceived { from, request } => self.handle_request(&from, request),
            RelayEvent::BytesReceived { from, bytes } => {
                let request = RelayRequest::decode(&bytes)?;
                self.handle_request(&from, request)
            },
            RelayEvent::Disconnected { actor_id } => self.handle_disconnected(&actor_id),
        }
    }

    fn handle_request(
        &mut self,
        from: &str,
        request: RelayRequest,
    ) -> Result<Vec<RelayAction>, RelayError> {
        if from.is_empty() {
            return Err(RelayError::EmptyActorId);
        }

        let actions = match request {
            RelayRequest::JoinRoom { room_id, actor_id } => {
                match self.check_actor(from, &actor_id) {
                    Some(rejection) => vec![rejection],
                    None => self.handle_join(&actor_id, &room_id),
                }
            },
            RelayRequest::LeaveRoom { room_id, actor_id } => {
                match self.check_actor(from, &actor_id) {
                    Some(rejection) => vec![rejection],
                    None => self.handle_leave(&actor_id, &room_id),
                }
            },
            RelayRequest::InitializeCrypto { actor_id, bundle } => {
                match self.check_actor(from, &actor_id) {
                    Some(rejection) => vec![rejection],
                    None => self.handle_initialize_crypto(&actor_id, &bundle),
                }
            },
            RelayRequest::GetUserKeys { actor_id } => self.handle_get_user_keys(from, actor_id),
            RelayRequest::SendEncrypted { room_id, envelope } => {
                match self.check_actor(from, &envelope.sender_key_id) {
                    Some(rejection) => vec![rejection],
                    None => self.handle_send_encrypted(from, room_id, envelope),
                }
            },
        };

        Ok(actions)
    }

    /// Connections may only act as the actor they are authenticated as.
    fn check_actor(&self, from: &str, claimed: &str) -> Option<RelayAction> {
        if claimed == from {
            return None;
        }
        Some(RelayAction::SendToActor {
            actor_id: from.to_string(),
            message: RelayMessage::error(ErrorPayload::request_rejected(format!(
                "connection for {from} cannot act as {claimed}"
            ))),
        })
    }

    fn handle_join(&mut self, actor_id: &str, room_id: &str) -> Vec<RelayAction> {
        let already_member = self.registry.is_member(actor_id, room_id);
        if !already_member && self.registry.room_size(room_id) >= self.config.max_room_size {
            return vec![
                self.log(LogLevel::Warn, format!("{actor_id} rejected from full room {room_id}")),
                RelayAction::SendToActor {
                    actor_id: actor_id.to_string(),
                    message: RelayMessage::error(ErrorPayload::room_full(
                        room_id,
                        self.config.max_room_size,
                    )),
                },
            ];
        }

        let peers = self.registry.peers_of(actor_id, room_id);
        self.registry.join(actor_id, room_id);

        let report = self.fanout.establish_pairwise_sessions(
            actor_id,
            room_id,
            peers.iter().map(String::as_str),
        );

        let mut actions = vec![self.log(
            LogLevel::Info,
            format!(
                "{actor_id} joined {room_id} ({} peers, {} sessions created)",
                peers.len(),
                report.created.len()
            ),
        )];
        for (peer, error) in &report.failed {
            actions.push(self.log(
                LogLevel::Warn,
                format!("session with {peer} in {room_id} deferred to first message: {error}"),
            ));
        }

        let mut logs = Vec::new();
        for peer in &peers {
            let presence = self.presence(peer, room_id, &mut logs);
            actions.push(RelayAction::SendToActor {
                actor_id: actor_id.to_string(),
                message: RelayMessage::UserAlreadyInRoom { presence },
            });
        }

        if !already_member {
            let presence = self.presence(actor_id, room_id, &mut logs);
            actions.push(RelayAction::BroadcastToRoom {
                room_id: room_id.to_string(),
                message: RelayMessage::UserJoined { presence },
                exclude: Some(actor_id.to_string()),
            });
        }

        actions.extend(logs);
        actions
    }

    fn handle_leave(&mut self, actor_id: &str, room_id: &str) -> Vec<RelayAction> {
        if !self.registry.leave(actor_id, room_id) {
            return vec![RelayAction::SendToActor {
                actor_id: actor_id.to_string(),
                message: RelayMessage::error(ErrorPayload::not_in_room(actor_id, room_id)),
            }];
        }

        vec![
            self.log(LogLevel::Info, format!("{actor_id} left {room_id}")),
            RelayAction::BroadcastToRoom {
                room_id: room_id.to_string(),
                message: RelayMessage::UserLeft {
                    actor_id: actor_id.to_string(),
                    room_id: room_id.to_string(),
                },
                exclude: None,
            },
        ]
    }

    fn handle_disconnected(&mut self, actor_id: &str) -> Result<Vec<RelayAction>, RelayError> {
        if actor_id.is_empty() {
            return Err(RelayError::EmptyActorId);
        }

        let rooms = self.registry.remove_actor(actor_id);
        let mut actions = vec![self.log(
            LogLevel::Debug,
            format!("{actor_id} disconnected from {} rooms", rooms.len()),
        )];

        for room_id in rooms {
            actions.push(RelayAction::BroadcastToRoom {
                message: RelayMessage::UserLeft {
                    actor_id: actor_id.to_string(),
                    room_id: room_id.clone(),
                },
                room_id,
                exclude: None,
            });
        }

        Ok(actions)
    }

    fn handle_initialize_crypto(
        &mut self,
        actor_id: &str,
        bundle: &parley_proto::KeyBundle,
    ) -> Vec<RelayAction> {
        match self.storage.save_key_bundle(actor_id, bundle) {
            Ok(()) => vec![
                self.log(LogLevel::Debug, format!("stored key bundle for {actor_id}")),
                RelayAction::SendToActor {
                    actor_id: actor_id.to_string(),
                    message: RelayMessage::CryptoInitialized { success: true, message: None },
                },
            ],
            Err(error) => vec![
                self.log(LogLevel::Error, format!("storing key bundle for {actor_id}: {error}")),
                RelayAction::SendToActor {
                    actor_id: actor_id.to_string(),
                    message: RelayMessage::CryptoInitialized {
                        success: false,
                        message: Some(error.to_string()),
                    },
                },
            ],
        }
    }

    fn handle_get_user_keys(&mut self, from: &str, actor_id: ActorId) -> Vec<RelayAction> {
        let message = match self.storage.load_key_bundle(&actor_id) {
            Ok(bundle) => RelayMessage::UserKeysResponse { actor_id, bundle },
            Err(error) => RelayMessage::error(ErrorPayload::storage_error(error.to_string())),
        };

        vec![RelayAction::SendToActor { actor_id: from.to_string(), message }]
    }

    fn handle_send_encrypted(
        &mut self,
        from: &str,
        room_id: RoomId,
        envelope: EncryptedEnvelope,
    ) -> Vec<RelayAction> {
        if !self.registry.is_member(from, &room_id) {
            return vec![RelayAction::SendToActor {
                actor_id: from.to_string(),
                message: RelayMessage::error(ErrorPayload::not_in_room(from, &room_id)),
            }];
        }

        let mut actions = Vec::new();
        let recipient = envelope.recipient_key_id.as_str();
        if !recipient.is_empty() && recipient != from {
            match self.bump_counter(from, recipient, &room_id) {
                Ok(count) => actions.push(self.log(
                    LogLevel::Debug,
                    format!("relayed envelope {count} for {from}:{recipient} in {room_id}"),
                )),
                Err(error) => actions.push(self.log(
                    LogLevel::Warn,
                    format!("session counter for {from}:{recipient} in {room_id}: {error}"),
                )),
            }
        }

        actions.push(RelayAction::BroadcastToRoom {
            message: RelayMessage::EncryptedMessageReceived { room_id: room_id.clone(), envelope },
            room_id,
            exclude: Some(from.to_string()),
        });

        actions
    }

    /// Advance the durable counter, creating the record first if fan-out
    /// never managed to.
    fn bump_counter(
        &self,
        sender: &str,
        recipient: &str,
        room_id: &str,
    ) -> Result<u64, RelayError> {
        let session_id = SessionId::canonicalize(sender, recipient);
        match self.storage.increment_message_counter(&session_id, room_id) {
            Err(StorageError::NotFound { .. }) => {
                self.fanout.ensure_session(sender, recipient, room_id)?;
                Ok(self.storage.increment_message_counter(&session_id, room_id)?)
            },
            other => Ok(other?),
        }
    }

    /// Presence of `actor_id` in `room_id`, with its published bundle if one
    /// can be loaded. Load failures are logged into `logs`.
    fn presence(
        &self,
        actor_id: &str,
        room_id: &str,
        logs: &mut Vec<RelayAction>,
    ) -> PresencePayload {
        let bundle = match self.storage.load_key_bundle(actor_id) {
            Ok(bundle) => bundle,
            Err(error) => {
                logs.push(
                    self.log(LogLevel::Warn, format!("loading key bundle for {actor_id}: {error}")),
                );
                None
            },
        };

        PresencePayload { actor_id: actor_id.to_string(), room_id: room_id.to_string(), bundle }
    }

    fn log(&self, level: LogLevel, message: String) -> RelayAction {
        RelayAction::Log { level, message, timestamp: self.env.wall_clock_secs() }
    }
}
