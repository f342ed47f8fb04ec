//! The canonical chat event envelope.
//!
//! One `MessageEvent` type serves both in-process broadcast and broker
//! transport. Its JSON field names are fixed for compatibility with
//! existing web clients:
//!
//! ```json
//! {
//!   "type": "new_message",
//!   "room_id": 5,
//!   "user_id": 9,
//!   "username": "alice",
//!   "content": "hi",
//!   "timestamp": "2024-01-01T00:00:00Z",
//!   "data": { "message_id": 17 }
//! }
//! ```
//!
//! `origin` is an additive optional field naming the publishing instance.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domain::foundation::{InstanceId, RoomId, Timestamp, UserId};

use super::Frame;

/// Event type tag carried in the `type` field.
///
/// Unknown tags are preserved verbatim so events from newer instances
/// pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    NewMessage,
    UserConnected,
    UserDisconnected,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::NewMessage => "new_message",
            EventKind::UserConnected => "user_connected",
            EventKind::UserDisconnected => "user_disconnected",
            EventKind::Other(tag) => tag,
        }
    }
}

impl From<String> for EventKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "new_message" => EventKind::NewMessage,
            "user_connected" => EventKind::UserConnected,
            "user_disconnected" => EventKind::UserDisconnected,
            _ => EventKind::Other(tag),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat event. Immutable once built; builders consume and return `Self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type")]
    kind: EventKind,
    room_id: RoomId,
    user_id: UserId,
    username: String,
    #[serde(default)]
    content: String,
    timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<InstanceId>,
}

impl MessageEvent {
    /// Creates an event of any kind stamped with the current time.
    pub fn new(
        kind: EventKind,
        room_id: RoomId,
        user_id: UserId,
        username: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            room_id,
            user_id,
            username: username.into(),
            content: content.into(),
            timestamp: Timestamp::now().to_rfc3339(),
            data: None,
            origin: None,
        }
    }

    /// A chat message posted by a user.
    pub fn new_message(
        room_id: RoomId,
        user_id: UserId,
        username: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::NewMessage, room_id, user_id, username, content)
    }

    /// Presence announcement for a user entering a room.
    pub fn user_connected(room_id: RoomId, user_id: UserId, username: impl Into<String>) -> Self {
        Self::new(EventKind::UserConnected, room_id, user_id, username, "")
    }

    /// Presence announcement for a user leaving a room.
    pub fn user_disconnected(
        room_id: RoomId,
        user_id: UserId,
        username: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::UserDisconnected, room_id, user_id, username, "")
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp.to_rfc3339();
        self
    }

    /// Adds one entry to the `data` object, creating it if absent.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_origin(mut self, origin: InstanceId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    pub fn origin(&self) -> Option<&InstanceId> {
        self.origin.as_ref()
    }

    /// True when this event was published by `instance`.
    pub fn originated_at(&self, instance: &InstanceId) -> bool {
        self.origin.as_ref() == Some(instance)
    }

    /// Serializes to the wire envelope.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a wire envelope.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Serializes into a frame ready for a connection outbox.
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        self.to_json().map(Frame::from)
    }
}
