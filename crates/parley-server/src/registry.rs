//! Presence registry for room membership tracking.
//!
//! The registry maintains bidirectional mappings: room → actors (for
//! broadcast and fan-out) and actor → rooms (for cleanup on disconnect).
//! Ordered sets keep iteration deterministic.

use std::collections::{BTreeSet, HashMap};

use parley_proto::{ActorId, RoomId};

/// Registry of which actors are present in which rooms.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    /// Room ID → present actors
    rooms: HashMap<RoomId, BTreeSet<ActorId>>,
    /// Actor ID → rooms the actor is present in
    actor_rooms: HashMap<ActorId, BTreeSet<RoomId>>,
}

impl PresenceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `actor_id` to `room_id`.
    ///
    /// Returns `false` if the actor was already present.
    pub fn join(&mut self, actor_id: &str, room_id: &str) -> bool {
        let added = self.rooms.entry(room_id.to_string()).or_default().insert(actor_id.to_string());
        if added {
            self.actor_rooms.entry(actor_id.to_string()).or_default().insert(room_id.to_string());
        }
        added
    }

    /// Remove `actor_id` from `room_id`.
    ///
    /// Returns `false` if the actor was not present. Empty rooms are dropped.
    pub fn leave(&mut self, actor_id: &str, room_id: &str) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        if !members.remove(actor_id) {
            return false;
        }
        if members.is_empty() {
            self.rooms.remove(room_id);
        }

        if let Some(rooms) = self.actor_rooms.get_mut(actor_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                self.actor_rooms.remove(actor_id);
            }
        }
        true
    }

    /// Remove `actor_id` from every room. Returns the rooms it was in.
    pub fn remove_actor(&mut self, actor_id: &str) -> BTreeSet<RoomId> {
        let rooms = self.actor_rooms.remove(actor_id).unwrap_or_default();

        for room_id in &rooms {
            if let Some(members) = self.rooms.get_mut(room_id) {
                members.remove(actor_id);
                if members.is_empty() {
                    self.rooms.remove(room_id);
                }
            }
        }

        rooms
    }

    /// Actors present in `room_id`, in order.
    pub fn members(&self, room_id: &str) -> Vec<ActorId> {
        self.rooms.get(room_id).map(|m| m.iter().cloned().collect()).unwrap_or_default()
    }

    /// Actors present in `room_id` other than `actor_id`.
    pub fn peers_of(&self, actor_id: &str, room_id: &str) -> Vec<ActorId> {
        self.rooms
            .get(room_id)
            .map(|m| m.iter().filter(|a| *a != actor_id).cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `actor_id` is present in `room_id`.
    pub fn is_member(&self, actor_id: &str, room_id: &str) -> bool {
        self.rooms.get(room_id).is_some_and(|m| m.contains(actor_id))
    }

    /// Number of actors present in `room_id`.
    pub fn room_size(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map_or(0, BTreeSet::len)
    }

    /// Rooms `actor_id` is present in.
    pub fn rooms_of(&self, actor_id: &str) -> Vec<RoomId> {
        self.actor_rooms.get(actor_id).map(|r| r.iter().cloned().collect()).unwrap_or_default()
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
