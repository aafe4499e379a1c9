//! Reference model for model-based testing.
//!
//! Tracks only what the protocol promises: who is in which room, and which
//! plaintexts each actor must end up reading. Operations are applied to both
//! this model and a [`SimWorld`](crate::SimWorld); their observable states
//! must agree.

use std::collections::{BTreeMap, BTreeSet};

use parley_proto::{ActorId, RoomId};

/// Actor names used by generated operations.
pub const ACTORS: [&str; 4] = ["alice", "bob", "carol", "dave"];

/// Room names used by generated operations.
pub const ROOMS: [&str; 2] = ["r1", "r2"];

/// Operation applied to both the model and the real world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Actor joins a room
    Join {
        /// Index into [`ACTORS`]
        actor: usize,
        /// Index into [`ROOMS`]
        room: usize,
    },
    /// Actor leaves a room
    Leave {
        /// Index into [`ACTORS`]
        actor: usize,
        /// Index into [`ROOMS`]
        room: usize,
    },
    /// Actor sends a message to another actor in a room
    Send {
        /// Sender, index into [`ACTORS`]
        from: usize,
        /// Recipient, index into [`ACTORS`]
        to: usize,
        /// Index into [`ROOMS`]
        room: usize,
        /// Message text
        text: String,
    },
}

/// Expected rejection of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// The acting actor has not joined the room
    NotInRoom,
    /// Sender and recipient are the same actor
    SelfAddressed,
}

/// Result of applying an operation.
pub type OperationResult = Result<(), OperationError>;

/// A message an actor is expected to have read.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModelDelivery {
    /// Room the message was sent in
    pub room_id: RoomId,
    /// Sender
    pub sender_id: ActorId,
    /// Text
    pub plaintext: String,
    /// Number the sender assigned
    pub message_number: u64,
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Rooms each actor has joined
    pub memberships: BTreeMap<ActorId, BTreeSet<RoomId>>,
    /// Messages each actor has read, in arrival order
    pub deliveries: BTreeMap<ActorId, Vec<ModelDelivery>>,
}

/// Reference implementation.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    memberships: BTreeMap<ActorId, BTreeSet<RoomId>>,
    sent: BTreeMap<(ActorId, ActorId), u64>,
    deliveries: BTreeMap<ActorId, Vec<ModelDelivery>>,
}

impl ModelWorld {
    /// Empty world in which every actor of [`ACTORS`] exists.
    pub fn new() -> Self {
        let mut world = Self::default();
        for actor in ACTORS {
            world.memberships.insert(actor.to_string(), BTreeSet::new());
            world.deliveries.insert(actor.to_string(), Vec::new());
        }
        world
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match op {
            Operation::Join { actor, room } => {
                self.rooms_of(*actor).insert(ROOMS[*room].to_string());
                Ok(())
            },
            Operation::Leave { actor, room } => {
                if self.rooms_of(*actor).remove(ROOMS[*room]) {
                    Ok(())
                } else {
                    Err(OperationError::NotInRoom)
                }
            },
            Operation::Send { from, to, room, text } => self.apply_send(*from, *to, *room, text),
        }
    }

    fn apply_send(&mut self, from: usize, to: usize, room: usize, text: &str) -> OperationResult {
        let room_id = ROOMS[room];
        if !self.rooms_of(from).contains(room_id) {
            return Err(OperationError::NotInRoom);
        }
        if from == to {
            return Err(OperationError::SelfAddressed);
        }

        let counter = self.sent.entry((ACTORS[from].to_string(), ACTORS[to].to_string())).or_default();
        *counter += 1;
        let message_number = *counter;

        if self.rooms_of(to).contains(room_id) {
            self.deliveries.entry(ACTORS[to].to_string()).or_default().push(ModelDelivery {
                room_id: room_id.to_string(),
                sender_id: ACTORS[from].to_string(),
                plaintext: text.to_string(),
                message_number,
            });
        }
        Ok(())
    }

    fn rooms_of(&mut self, actor: usize) -> &mut BTreeSet<RoomId> {
        self.memberships.entry(ACTORS[actor].to_string()).or_default()
    }

    /// Members of `room_id`.
    pub fn members(&self, room_id: &str) -> Vec<ActorId> {
        self.memberships
            .iter()
            .filter(|(_, rooms)| rooms.contains(room_id))
            .map(|(actor, _)| actor.clone())
            .collect()
    }

    /// Observable state.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState { memberships: self.memberships.clone(), deliveries: self.deliveries.clone() }
    }
}
