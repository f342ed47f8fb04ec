//! Connection registry and room-scoped broadcast.
//!
//! One `tokio::sync::Mutex` guards the global connection table and the
//! room membership tables together. Every join, leave, eviction and
//! broadcast runs under it, and tokio's mutex is fair, so broadcasts to a
//! room are applied in the order they were submitted.
//!
//! Broadcasts never wait on a client. A member whose outbox is full or
//! already closed is evicted on the spot.

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

use crate::domain::chat::{ConnectionState, Frame};
use crate::domain::foundation::{ConnectionId, RoomId, Timestamp, UserId};

use super::connection::{Connection, ConnectionIdentity, Lifecycle};
use super::rooms::RoomMembership;

/// Result of [`ConnectionRegistry::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection is now a member of the room.
    Joined,
    /// The connection was already a member. Nothing changed.
    AlreadyMember,
    /// The user had another connection in the room. It was evicted.
    Replaced { evicted: ConnectionId },
    /// The connection is not registered.
    Unknown,
}

/// Result of a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members whose outbox accepted the frame.
    pub delivered: usize,
    /// Members dropped because their outbox was full or closed.
    pub evicted: Vec<ConnectionId>,
}

/// Point-in-time view of one registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub username: String,
    pub room_id: Option<RoomId>,
    pub state: ConnectionState,
    pub connected_at: Timestamp,
    pub last_active: Timestamp,
}

/// Registry-wide counters for health reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RegistryStats {
    pub connections: usize,
    pub rooms: usize,
}

struct ConnectionEntry {
    identity: ConnectionIdentity,
    room_id: Option<RoomId>,
    outbox: mpsc::Sender<Frame>,
    lifecycle: Lifecycle,
    connected_at: Timestamp,
    last_active: Timestamp,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    membership: RoomMembership,
}

impl RegistryState {
    fn leave(&mut self, id: ConnectionId) -> bool {
        let Some(entry) = self.connections.get_mut(&id) else {
            return false;
        };
        let Some(room_id) = entry.room_id.take() else {
            return false;
        };
        self.membership.remove(id, entry.identity.user_id, room_id);
        true
    }

    /// Leaves the room and drops the entry, which closes the outbox.
    /// The entry's lifecycle moves to `Closing`, which stops its read pump.
    fn remove(&mut self, id: ConnectionId) -> bool {
        self.leave(id);
        match self.connections.remove(&id) {
            Some(entry) => {
                entry.lifecycle.begin_closing();
                true
            }
            None => false,
        }
    }

    /// Removes a connection superseded by a newer one for the same user and room.
    fn replace(&mut self, id: ConnectionId) {
        if let Some(entry) = self.connections.get(&id) {
            entry.lifecycle.mark_replaced();
        }
        self.remove(id);
    }

    fn deliver(
        &mut self,
        targets: impl IntoIterator<Item = ConnectionId>,
        frame: &Frame,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for id in targets {
            let Some(entry) = self.connections.get(&id) else {
                continue;
            };
            match entry.outbox.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        connection_id = %id,
                        user_id = %entry.identity.user_id,
                        "Outbox full, evicting slow consumer"
                    );
                    report.evicted.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %id, "Outbox closed, evicting");
                    report.evicted.push(id);
                }
            }
        }

        for id in &report.evicted {
            self.remove(*id);
        }

        report
    }
}

/// Tracks every live connection on this instance and routes frames to rooms.
#[derive(Default)]
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the global set. It is not in any room yet.
    pub async fn register(&self, connection: Connection) -> ConnectionId {
        let (id, identity, outbox, lifecycle) = connection.into_parts();
        let now = Timestamp::now();

        let mut state = self.state.lock().await;
        tracing::debug!(connection_id = %id, user_id = %identity.user_id, "Connection registered");
        state.connections.insert(
            id,
            ConnectionEntry {
                identity,
                room_id: None,
                outbox,
                lifecycle,
                connected_at: now,
                last_active: now,
            },
        );
        id
    }

    /// Puts the connection in `room_id`.
    ///
    /// Any other connection the same user holds in that room is evicted.
    /// A connection in a different room is moved out of it first.
    pub async fn join(&self, id: ConnectionId, room_id: RoomId) -> JoinOutcome {
        let mut state = self.state.lock().await;

        let Some(entry) = state.connections.get(&id) else {
            return JoinOutcome::Unknown;
        };
        let user_id = entry.identity.user_id;
        let current_room = entry.room_id;

        let evicted = match state.membership.occupant(user_id, room_id) {
            Some(occupant) if occupant == id && current_room == Some(room_id) => {
                return JoinOutcome::AlreadyMember;
            }
            Some(occupant) if occupant != id => {
                state.replace(occupant);
                tracing::info!(
                    connection_id = %occupant,
                    replaced_by = %id,
                    user_id = %user_id,
                    room_id = %room_id,
                    "Duplicate connection evicted"
                );
                Some(occupant)
            }
            _ => None,
        };

        state.leave(id);
        state.membership.insert(id, user_id, room_id);
        if let Some(entry) = state.connections.get_mut(&id) {
            entry.room_id = Some(room_id);
        }

        tracing::debug!(connection_id = %id, room_id = %room_id, "Joined room");

        match evicted {
            Some(evicted) => JoinOutcome::Replaced { evicted },
            None => JoinOutcome::Joined,
        }
    }

    /// Removes the connection from its room. Returns `false` if it was in none.
    pub async fn leave(&self, id: ConnectionId) -> bool {
        self.state.lock().await.leave(id)
    }

    /// Removes the connection entirely, closing its outbox.
    ///
    /// Returns `false` if it was already gone, e.g. evicted by a broadcast.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.state.lock().await.remove(id);
        if removed {
            tracing::debug!(connection_id = %id, "Connection unregistered");
        }
        removed
    }

    /// Records activity on the connection.
    pub async fn touch(&self, id: ConnectionId) -> bool {
        let mut state = self.state.lock().await;
        match state.connections.get_mut(&id) {
            Some(entry) => {
                entry.last_active = Timestamp::now();
                true
            }
            None => false,
        }
    }

    /// Offers `frame` to every member of `room_id`.
    pub async fn broadcast_to_room(&self, room_id: RoomId, frame: &Frame) -> BroadcastReport {
        let mut state = self.state.lock().await;
        let members = state.membership.members(room_id);
        let report = state.deliver(members, frame);

        tracing::trace!(
            room_id = %room_id,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Room broadcast"
        );
        report
    }

    /// Offers `frame` to every registered connection, in a room or not.
    pub async fn broadcast_global(&self, frame: &Frame) -> BroadcastReport {
        let mut state = self.state.lock().await;
        let targets = state.connections.keys().copied().collect::<Vec<_>>();
        state.deliver(targets, frame)
    }

    // === Views ===

    pub async fn room_members(&self, room_id: RoomId) -> Vec<ConnectionId> {
        self.state.lock().await.membership.members(room_id)
    }

    pub async fn room_of(&self, id: ConnectionId) -> Option<RoomId> {
        self.state
            .lock()
            .await
            .connections
            .get(&id)
            .and_then(|entry| entry.room_id)
    }

    pub async fn user_room_connection(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Option<ConnectionId> {
        self.state.lock().await.membership.occupant(user_id, room_id)
    }

    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        self.state.lock().await.connections.contains_key(&id)
    }

    pub async fn connection_count(&self) -> usize {
        self.state.lock().await.connections.len()
    }

    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.state.lock().await.connections.keys().copied().collect()
    }

    pub async fn active_rooms(&self) -> Vec<RoomId> {
        self.state.lock().await.membership.active_rooms()
    }

    pub async fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        let state = self.state.lock().await;
        state.connections.get(&id).map(|entry| ConnectionInfo {
            id,
            user_id: entry.identity.user_id,
            username: entry.identity.username.clone(),
            room_id: entry.room_id,
            state: entry.lifecycle.state(),
            connected_at: entry.connected_at,
            last_active: entry.last_active,
        })
    }

    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.lock().await;
        RegistryStats {
            connections: state.connections.len(),
            rooms: state.membership.room_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::connection::Outbox;
    use tokio::sync::mpsc::error::TryRecvError;

    fn room(id: u64) -> RoomId {
        RoomId::new(id).unwrap()
    }

    fn connection(user: u64, capacity: usize) -> (Connection, Outbox) {
        let identity = ConnectionIdentity::new(UserId::new(user).unwrap(), format!("user{}", user));
        Connection::new(identity, capacity)
    }

    async fn joined(
        registry: &ConnectionRegistry,
        user: u64,
        room_id: RoomId,
    ) -> (ConnectionId, Outbox) {
        let (conn, outbox) = connection(user, 8);
        let id = registry.register(conn).await;
        registry.join(id, room_id).await;
        (id, outbox)
    }

    #[tokio::test]
    async fn register_adds_to_global_set_only() {
        let registry = ConnectionRegistry::new();
        let (conn, _outbox) = connection(1, 8);
        let id = registry.register(conn).await;

        assert!(registry.is_registered(id).await);
        assert_eq!(registry.room_of(id).await, None);
        assert!(registry.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn join_places_connection_in_room() {
        let registry = ConnectionRegistry::new();
        let (conn, _outbox) = connection(1, 8);
        let id = registry.register(conn).await;

        assert_eq!(registry.join(id, room(5)).await, JoinOutcome::Joined);
        assert_eq!(registry.room_of(id).await, Some(room(5)));
        assert_eq!(registry.room_members(room(5)).await, vec![id]);
        assert_eq!(
            registry
                .user_room_connection(UserId::new(1).unwrap(), room(5))
                .await,
            Some(id)
        );
    }

    #[tokio::test]
    async fn rejoining_same_room_is_noop() {
        let registry = ConnectionRegistry::new();
        let (id, _outbox) = joined(&registry, 1, room(5)).await;

        assert_eq!(registry.join(id, room(5)).await, JoinOutcome::AlreadyMember);
        assert_eq!(registry.room_members(room(5)).await, vec![id]);
    }

    #[tokio::test]
    async fn joining_another_room_moves_connection() {
        let registry = ConnectionRegistry::new();
        let (id, _outbox) = joined(&registry, 1, room(5)).await;

        registry.join(id, room(7)).await;

        assert_eq!(registry.room_of(id).await, Some(room(7)));
        assert_eq!(registry.active_rooms().await, vec![room(7)]);
    }

    #[tokio::test]
    async fn join_unknown_connection_is_reported() {
        let registry = ConnectionRegistry::new();
        assert_eq!(
            registry.join(ConnectionId::new(), room(5)).await,
            JoinOutcome::Unknown
        );
        assert!(registry.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_join_evicts_previous_connection() {
        let registry = ConnectionRegistry::new();
        let (first, mut first_outbox) = joined(&registry, 1, room(5)).await;

        let (conn, _outbox) = connection(1, 8);
        let second = registry.register(conn).await;

        assert_eq!(
            registry.join(second, room(5)).await,
            JoinOutcome::Replaced { evicted: first }
        );
        assert!(!registry.is_registered(first).await);
        assert_eq!(registry.room_members(room(5)).await, vec![second]);
        assert!(matches!(
            first_outbox.try_next(),
            Err(TryRecvError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn same_user_in_different_rooms_is_allowed() {
        let registry = ConnectionRegistry::new();
        let (a, _oa) = joined(&registry, 1, room(5)).await;
        let (b, _ob) = joined(&registry, 1, room(7)).await;

        assert!(registry.is_registered(a).await);
        assert!(registry.is_registered(b).await);
    }

    #[tokio::test]
    async fn broadcast_reaches_only_room_members() {
        let registry = ConnectionRegistry::new();
        let (_, mut in_room) = joined(&registry, 1, room(5)).await;
        let (_, mut elsewhere) = joined(&registry, 2, room(7)).await;

        let report = registry.broadcast_to_room(room(5), &Frame::from("hi")).await;

        assert_eq!(report.delivered, 1);
        assert!(report.evicted.is_empty());
        assert_eq!(in_room.try_next().unwrap(), Frame::from("hi"));
        assert!(matches!(elsewhere.try_next(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn broadcast_to_empty_room_is_noop() {
        let registry = ConnectionRegistry::new();
        let report = registry.broadcast_to_room(room(9), &Frame::from("x")).await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn full_outbox_is_evicted() {
        let registry = ConnectionRegistry::new();
        let (conn, mut slow_outbox) = connection(1, 1);
        let slow = registry.register(conn).await;
        registry.join(slow, room(5)).await;
        let (_, mut fast_outbox) = joined(&registry, 2, room(5)).await;

        registry.broadcast_to_room(room(5), &Frame::from("one")).await;
        let report = registry.broadcast_to_room(room(5), &Frame::from("two")).await;

        assert_eq!(report.evicted, vec![slow]);
        assert_eq!(report.delivered, 1);
        assert!(!registry.is_registered(slow).await);

        assert_eq!(fast_outbox.try_next().unwrap(), Frame::from("one"));
        assert_eq!(fast_outbox.try_next().unwrap(), Frame::from("two"));
        assert_eq!(slow_outbox.try_next().unwrap(), Frame::from("one"));
        assert!(matches!(
            slow_outbox.try_next(),
            Err(TryRecvError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn closed_outbox_is_evicted() {
        let registry = ConnectionRegistry::new();
        let (id, outbox) = joined(&registry, 1, room(5)).await;
        drop(outbox);

        let report = registry.broadcast_to_room(room(5), &Frame::from("x")).await;

        assert_eq!(report.evicted, vec![id]);
        assert!(registry.active_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn broadcast_global_includes_roomless_connections() {
        let registry = ConnectionRegistry::new();
        let (_, mut in_room) = joined(&registry, 1, room(5)).await;
        let (conn, mut lobby) = connection(2, 8);
        registry.register(conn).await;

        let report = registry.broadcast_global(&Frame::from("all")).await;

        assert_eq!(report.delivered, 2);
        assert!(in_room.try_next().is_ok());
        assert!(lobby.try_next().is_ok());
    }

    #[tokio::test]
    async fn last_leave_removes_room() {
        let registry = ConnectionRegistry::new();
        let (id, _outbox) = joined(&registry, 1, room(5)).await;

        assert!(registry.leave(id).await);
        assert!(registry.active_rooms().await.is_empty());
        assert!(registry.is_registered(id).await);
    }

    #[tokio::test]
    async fn leave_and_unregister_are_idempotent() {
        let registry = ConnectionRegistry::new();
        let (id, _outbox) = joined(&registry, 1, room(5)).await;

        assert!(registry.leave(id).await);
        assert!(!registry.leave(id).await);
        assert!(registry.unregister(id).await);
        assert!(!registry.unregister(id).await);
        assert!(!registry.leave(id).await);
    }

    #[tokio::test]
    async fn touch_updates_last_active() {
        let registry = ConnectionRegistry::new();
        let (id, _outbox) = joined(&registry, 1, room(5)).await;
        let before = registry.connection_info(id).await.unwrap().last_active;

        assert!(registry.touch(id).await);

        let after = registry.connection_info(id).await.unwrap().last_active;
        assert!(after >= before);
        assert!(!registry.touch(ConnectionId::new()).await);
    }

    #[tokio::test]
    async fn stats_count_connections_and_rooms() {
        let registry = ConnectionRegistry::new();
        let _a = joined(&registry, 1, room(5)).await;
        let _b = joined(&registry, 2, room(5)).await;
        let _c = joined(&registry, 3, room(7)).await;

        assert_eq!(
            registry.stats().await,
            RegistryStats {
                connections: 3,
                rooms: 2
            }
        );
    }
}
