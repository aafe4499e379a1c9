//! Simulated world: one relay, many clients, synchronous delivery.
//!
//! Requests produced by a client go straight into the [`RelayDriver`]; the
//! relay's actions are routed to the addressed clients, whose replies are
//! queued in turn until the world is quiescent. Everything a client surfaces
//! other than outbound requests lands in that actor's inbox.

use std::collections::{BTreeMap, VecDeque};

use parley_client::{Client, ClientAction, ClientError, ClientEvent};
use parley_core::ServiceConfig;
use parley_proto::{ActorId, EncryptedEnvelope, RelayMessage, RelayRequest, RoomId};
use parley_server::{MemoryStorage, RelayAction, RelayConfig, RelayDriver, RelayError, RelayEvent};
use thiserror::Error;

use crate::sim_env::SimEnv;

/// Errors raised while driving the world.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Event addressed to an actor that was never added
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),

    /// A client rejected an event
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The relay failed to process a request
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Rewrites envelopes in flight between a client and the relay.
pub type EnvelopeTamper = fn(&mut EncryptedEnvelope);

/// A relay and its clients sharing one deterministic environment.
pub struct SimWorld {
    env: SimEnv,
    service_config: ServiceConfig,
    relay: RelayDriver<SimEnv, MemoryStorage>,
    clients: BTreeMap<ActorId, Client<SimEnv>>,
    inboxes: BTreeMap<ActorId, Vec<ClientAction>>,
    tamper: Option<EnvelopeTamper>,
}

impl SimWorld {
    /// Create an empty world with default relay and session settings.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, RelayConfig::default(), ServiceConfig::default())
    }

    /// Create an empty world with explicit settings.
    pub fn with_config(seed: u64, relay_config: RelayConfig, service_config: ServiceConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        let relay = RelayDriver::new(env.clone(), MemoryStorage::new(), relay_config);

        Self {
            env,
            service_config,
            relay,
            clients: BTreeMap::new(),
            inboxes: BTreeMap::new(),
            tamper: None,
        }
    }

    /// Shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The relay.
    pub fn relay(&self) -> &RelayDriver<SimEnv, MemoryStorage> {
        &self.relay
    }

    /// Add a client for `actor_id`. Re-adding an actor keeps the existing one.
    pub fn add_actor(&mut self, actor_id: &str) {
        if self.clients.contains_key(actor_id) {
            return;
        }
        let client = Client::with_config(self.env.clone(), actor_id, self.service_config.clone());
        self.clients.insert(actor_id.to_string(), client);
        self.inboxes.insert(actor_id.to_string(), Vec::new());
    }

    /// Client state of `actor_id`.
    pub fn client(&self, actor_id: &str) -> Option<&Client<SimEnv>> {
        self.clients.get(actor_id)
    }

    /// Everything surfaced to `actor_id` so far.
    pub fn inbox(&self, actor_id: &str) -> &[ClientAction] {
        self.inboxes.get(actor_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Drain the inbox of `actor_id`.
    pub fn take_inbox(&mut self, actor_id: &str) -> Vec<ClientAction> {
        self.inboxes.get_mut(actor_id).map(std::mem::take).unwrap_or_default()
    }

    /// Rewrite every envelope relayed from now on.
    pub fn set_tamper(&mut self, tamper: EnvelopeTamper) {
        self.tamper = Some(tamper);
    }

    /// Stop rewriting envelopes.
    pub fn clear_tamper(&mut self) {
        self.tamper = None;
    }

    /// Generate keys for `actor_id` and publish them.
    pub fn initialize(&mut self, actor_id: &str) -> Result<(), WorldError> {
        self.apply(actor_id, ClientEvent::InitializeCrypto)
    }

    /// `actor_id` joins `room_id`.
    pub fn join(&mut self, actor_id: &str, room_id: &str) -> Result<(), WorldError> {
        self.apply(actor_id, ClientEvent::JoinRoom { room_id: room_id.to_string() })
    }

    /// `actor_id` leaves `room_id`.
    pub fn leave(&mut self, actor_id: &str, room_id: &str) -> Result<(), WorldError> {
        self.apply(actor_id, ClientEvent::LeaveRoom { room_id: room_id.to_string() })
    }

    /// `sender_id` sends `plaintext` to `recipient_id` in `room_id`.
    pub fn send(
        &mut self,
        sender_id: &str,
        room_id: &str,
        recipient_id: &str,
        plaintext: &str,
    ) -> Result<(), WorldError> {
        self.apply(sender_id, ClientEvent::SendMessage {
            room_id: room_id.to_string(),
            recipient_id: recipient_id.to_string(),
            plaintext: plaintext.to_string(),
        })
    }

    /// `actor_id`'s connection drops.
    pub fn disconnect(&mut self, actor_id: &str) -> Result<(), WorldError> {
        let actions =
            self.relay.process_event(RelayEvent::Disconnected { actor_id: actor_id.to_string() })?;
        let mut queue = VecDeque::new();
        self.route_relay_actions(actions, &mut queue)?;
        self.run(queue)
    }

    /// Feed `event` to `actor_id` and run the world until quiescent.
    pub fn apply(&mut self, actor_id: &str, event: ClientEvent) -> Result<(), WorldError> {
        let client = self
            .clients
            .get_mut(actor_id)
            .ok_or_else(|| WorldError::UnknownActor(actor_id.to_string()))?;
        let actions = client.handle(event)?;

        let mut queue = VecDeque::new();
        self.collect(actor_id, actions, &mut queue);
        self.run(queue)
    }

    fn run(&mut self, mut queue: VecDeque<(ActorId, RelayRequest)>) -> Result<(), WorldError> {
        while let Some((from, mut request)) = queue.pop_front() {
            if let (Some(tamper), RelayRequest::SendEncrypted { envelope, .. }) =
                (self.tamper, &mut request)
            {
                tamper(envelope);
            }

            let actions = self.relay.process_event(RelayEvent::RequestReceived { from, request })?;
            self.route_relay_actions(actions, &mut queue)?;
        }
        Ok(())
    }

    fn route_relay_actions(
        &mut self,
        actions: Vec<RelayAction>,
        queue: &mut VecDeque<(ActorId, RelayRequest)>,
    ) -> Result<(), WorldError> {
        for action in actions {
            match action {
                RelayAction::SendToActor { actor_id, message } => {
                    self.deliver(&actor_id, message, queue)?;
                },
                RelayAction::BroadcastToRoom { room_id, message, exclude } => {
                    for member in self.recipients(&room_id, exclude.as_deref()) {
                        self.deliver(&member, message.clone(), queue)?;
                    }
                },
                log @ RelayAction::Log { .. } => parley_server::trace_action(&log),
            }
        }
        Ok(())
    }

    fn recipients(&self, room_id: &RoomId, exclude: Option<&str>) -> Vec<ActorId> {
        self.relay
            .registry()
            .members(room_id)
            .into_iter()
            .filter(|m| Some(m.as_str()) != exclude)
            .collect()
    }

    fn deliver(
        &mut self,
        actor_id: &str,
        message: RelayMessage,
        queue: &mut VecDeque<(ActorId, RelayRequest)>,
    ) -> Result<(), WorldError> {
        let Some(client) = self.clients.get_mut(actor_id) else {
            tracing::debug!(actor = actor_id, "dropping message for actor without a client");
            return Ok(());
        };
        let actions = client.handle(ClientEvent::RelayMessageReceived(message))?;
        self.collect(actor_id, actions, queue);
        Ok(())
    }

    fn collect(
        &mut self,
        actor_id: &str,
        actions: Vec<ClientAction>,
        queue: &mut VecDeque<(ActorId, RelayRequest)>,
    ) {
        for action in actions {
            match action {
                ClientAction::Send(request) => queue.push_back((actor_id.to_string(), request)),
                other => self.inboxes.entry(actor_id.to_string()).or_default().push(other),
            }
        }
    }
}
