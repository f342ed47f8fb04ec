//! Integration tests for room membership and fanout on one instance.
//!
//! These tests drive the registry the way the gateway and pumps do:
//! 1. Connections register, then join a room
//! 2. Frames are broadcast to a room or to everyone
//! 3. Connections leave, get evicted, or unregister

use chat_fanout::adapters::websocket::{
    Connection, ConnectionIdentity, ConnectionRegistry, JoinOutcome, Outbox,
};
use chat_fanout::domain::chat::{ConnectionState, EventKind, Frame, MessageEvent};
use chat_fanout::domain::foundation::{ConnectionId, RoomId, UserId};
use tokio::sync::mpsc::error::TryRecvError;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn room(id: u64) -> RoomId {
    RoomId::new(id).unwrap()
}

fn user(id: u64) -> UserId {
    UserId::new(id).unwrap()
}

async fn connect(
    registry: &ConnectionRegistry,
    user_id: u64,
    room_id: RoomId,
    capacity: usize,
) -> (ConnectionId, Outbox) {
    let identity = ConnectionIdentity::new(user(user_id), format!("user{}", user_id));
    let (connection, outbox) = Connection::new(identity, capacity);
    let id = registry.register(connection).await;
    registry.join(id, room_id).await;
    (id, outbox)
}

fn drain(outbox: &mut Outbox) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = outbox.try_next() {
        frames.push(frame);
    }
    frames
}

fn is_closed(outbox: &mut Outbox) -> bool {
    loop {
        match outbox.try_next() {
            Ok(_) => continue,
            Err(TryRecvError::Disconnected) => return true,
            Err(TryRecvError::Empty) => return false,
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn second_connection_for_same_user_and_room_replaces_first() {
    let registry = ConnectionRegistry::new();
    let (c1, mut c1_outbox) = connect(&registry, 9, room(5), 8).await;

    let identity = ConnectionIdentity::new(user(9), "user9");
    let (connection, _c2_outbox) = Connection::new(identity, 8);
    let c2 = registry.register(connection).await;
    let outcome = registry.join(c2, room(5)).await;

    assert_eq!(outcome, JoinOutcome::Replaced { evicted: c1 });
    assert!(is_closed(&mut c1_outbox));
    assert!(!registry.is_registered(c1).await);
    assert_eq!(registry.room_members(room(5)).await, vec![c2]);
    assert_eq!(registry.user_room_connection(user(9), room(5)).await, Some(c2));
}

#[tokio::test]
async fn saturated_member_is_evicted_and_others_still_receive() {
    let registry = ConnectionRegistry::new();
    let (a, mut a_outbox) = connect(&registry, 1, room(5), 1).await;
    let (b, mut b_outbox) = connect(&registry, 2, room(5), 8).await;
    let (c, mut c_outbox) = connect(&registry, 3, room(5), 8).await;

    // A's single slot fills and is never drained
    let first = registry.broadcast_to_room(room(5), &Frame::from("f1")).await;
    assert_eq!(first.delivered, 3);

    let second = registry.broadcast_to_room(room(5), &Frame::from("f2")).await;
    assert_eq!(second.evicted, vec![a]);
    assert_eq!(second.delivered, 2);

    assert!(!registry.is_registered(a).await);
    let members = registry.room_members(room(5)).await;
    assert_eq!(members.len(), 2);
    assert!(members.contains(&b));
    assert!(members.contains(&c));

    assert_eq!(drain(&mut b_outbox), vec![Frame::from("f1"), Frame::from("f2")]);
    assert_eq!(drain(&mut c_outbox), vec![Frame::from("f1"), Frame::from("f2")]);
    assert_eq!(a_outbox.try_next().unwrap(), Frame::from("f1"));
    assert!(is_closed(&mut a_outbox));
}

#[tokio::test]
async fn saturated_member_is_moved_to_closing_and_not_marked_replaced() {
    let registry = ConnectionRegistry::new();
    let identity = ConnectionIdentity::new(user(1), "user1");
    let (connection, _a_outbox) = Connection::new(identity, 1);
    let lifecycle = connection.lifecycle().clone();
    let a = registry.register(connection).await;
    registry.join(a, room(5)).await;
    lifecycle.activate();

    registry.broadcast_to_room(room(5), &Frame::from("f1")).await;
    let report = registry.broadcast_to_room(room(5), &Frame::from("f2")).await;

    assert_eq!(report.evicted, vec![a]);
    assert_eq!(lifecycle.state(), ConnectionState::Closing);
    // Backpressure eviction is a real departure and gets announced
    assert!(!lifecycle.was_replaced());
    assert!(!registry.touch(a).await);
}

#[tokio::test]
async fn replaced_connection_is_marked_and_closing() {
    let registry = ConnectionRegistry::new();
    let identity = ConnectionIdentity::new(user(9), "user9");
    let (first, _first_outbox) = Connection::new(identity.clone(), 8);
    let first_lifecycle = first.lifecycle().clone();
    let c1 = registry.register(first).await;
    registry.join(c1, room(5)).await;

    let (second, _second_outbox) = Connection::new(identity, 8);
    let second_lifecycle = second.lifecycle().clone();
    let c2 = registry.register(second).await;
    registry.join(c2, room(5)).await;

    assert!(first_lifecycle.was_replaced());
    assert_eq!(first_lifecycle.state(), ConnectionState::Closing);
    assert!(!second_lifecycle.was_replaced());
    assert_eq!(second_lifecycle.state(), ConnectionState::Connecting);
}

#[tokio::test]
async fn last_member_leaving_removes_room() {
    let registry = ConnectionRegistry::new();
    let (a, _a_outbox) = connect(&registry, 1, room(5), 8).await;
    let (b, _b_outbox) = connect(&registry, 2, room(5), 8).await;

    registry.leave(a).await;
    assert_eq!(registry.active_rooms().await, vec![room(5)]);

    registry.leave(b).await;
    assert!(registry.active_rooms().await.is_empty());
    assert!(registry.room_members(room(5)).await.is_empty());
}

#[tokio::test]
async fn unregister_and_leave_twice_are_noops() {
    let registry = ConnectionRegistry::new();
    let (a, _a_outbox) = connect(&registry, 1, room(5), 8).await;

    assert!(registry.unregister(a).await);
    assert!(!registry.unregister(a).await);
    assert!(!registry.leave(a).await);
    assert_eq!(registry.connection_count().await, 0);
    assert!(registry.active_rooms().await.is_empty());
}

#[tokio::test]
async fn room_broadcast_preserves_submission_order() {
    let registry = ConnectionRegistry::new();
    let (_, mut outbox) = connect(&registry, 1, room(5), 64).await;

    for i in 0..32 {
        registry
            .broadcast_to_room(room(5), &Frame::from(format!("m{}", i)))
            .await;
    }

    let expected = (0..32)
        .map(|i| Frame::from(format!("m{}", i)))
        .collect::<Vec<_>>();
    assert_eq!(drain(&mut outbox), expected);
}

#[tokio::test]
async fn concurrent_broadcasts_from_many_tasks_all_arrive() {
    let registry = std::sync::Arc::new(ConnectionRegistry::new());
    let (_, mut outbox) = connect(&registry, 1, room(5), 256).await;

    let mut handles = Vec::new();
    for task in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..16 {
                registry
                    .broadcast_to_room(room(5), &Frame::from(format!("t{}-{}", task, i)))
                    .await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let frames = drain(&mut outbox);
    assert_eq!(frames.len(), 128);

    // Each task's frames arrive in the order that task sent them
    for task in 0..8 {
        let prefix = format!("t{}-", task);
        let seen = frames
            .iter()
            .filter_map(|f| f.as_str().strip_prefix(&prefix))
            .map(|n| n.parse::<u32>().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn serialized_events_reach_members_intact() {
    let registry = ConnectionRegistry::new();
    let (_, mut outbox) = connect(&registry, 2, room(5), 8).await;

    let event = MessageEvent::new_message(room(5), user(9), "alice", "hi")
        .with_data("message_id", 17);
    registry
        .broadcast_to_room(room(5), &event.to_frame().unwrap())
        .await;

    let received = MessageEvent::from_json(outbox.try_next().unwrap().as_str()).unwrap();
    assert_eq!(received, event);
    assert_eq!(received.kind(), &EventKind::NewMessage);
}

#[tokio::test]
async fn global_broadcast_reaches_every_room() {
    let registry = ConnectionRegistry::new();
    let (_, mut a) = connect(&registry, 1, room(5), 8).await;
    let (_, mut b) = connect(&registry, 2, room(7), 8).await;

    let report = registry.broadcast_global(&Frame::from("notice")).await;

    assert_eq!(report.delivered, 2);
    assert_eq!(drain(&mut a), vec![Frame::from("notice")]);
    assert_eq!(drain(&mut b), vec![Frame::from("notice")]);
}
