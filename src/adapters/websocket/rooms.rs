//! Room membership tables for room-scoped routing.
//!
//! # Architecture
//!
//! ```text
//! rooms                         user_rooms
//! Room 5    Room 7              (user 9, room 5) → conn-a
//! ├── conn-a  ├── conn-c        (user 4, room 5) → conn-b
//! └── conn-b  └── conn-d        (user 9, room 7) → conn-c
//! ```
//!
//! Plain data with no locking of its own. The registry mutates it only
//! while holding its single lock, so both tables always change together.

use std::collections::{HashMap, HashSet};

use crate::domain::foundation::{ConnectionId, RoomId, UserId};

/// Room → members plus the `(user, room)` uniqueness index.
#[derive(Debug, Default)]
pub struct RoomMembership {
    /// Rooms with at least one member. Empty sets are removed eagerly.
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,

    /// At most one connection per user per room.
    user_rooms: HashMap<(UserId, RoomId), ConnectionId>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection currently holding `(user_id, room_id)`, if any.
    pub fn occupant(&self, user_id: UserId, room_id: RoomId) -> Option<ConnectionId> {
        self.user_rooms.get(&(user_id, room_id)).copied()
    }

    /// Adds `id` to `room_id` and claims the `(user_id, room_id)` slot.
    ///
    /// Callers evict any previous occupant first.
    pub fn insert(&mut self, id: ConnectionId, user_id: UserId, room_id: RoomId) {
        self.rooms.entry(room_id).or_default().insert(id);
        self.user_rooms.insert((user_id, room_id), id);
    }

    /// Removes `id` from `room_id`, dropping the room once it is empty.
    ///
    /// The user index entry is released only if it still points at `id`.
    /// Returns whether `id` was a member.
    pub fn remove(&mut self, id: ConnectionId, user_id: UserId, room_id: RoomId) -> bool {
        let removed = match self.rooms.get_mut(&room_id) {
            Some(members) => {
                let removed = members.remove(&id);
                if members.is_empty() {
                    self.rooms.remove(&room_id);
                }
                removed
            }
            None => false,
        };

        if self.user_rooms.get(&(user_id, room_id)) == Some(&id) {
            self.user_rooms.remove(&(user_id, room_id));
        }

        removed
    }

    /// Snapshot of a room's members.
    pub fn members(&self, room_id: RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, room_id: RoomId) -> usize {
        self.rooms.get(&room_id).map(HashSet::len).unwrap_or(0)
    }

    pub fn contains(&self, room_id: RoomId, id: ConnectionId) -> bool {
        self.rooms
            .get(&room_id)
            .is_some_and(|members| members.contains(&id))
    }

    /// Rooms with at least one member.
    pub fn active_rooms(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
