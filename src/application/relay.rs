//! ChatRelay - turns accepted chat input into fanned-out events.
//!
//! Every locally-originated event takes the same path:
//!
//! 1. Broadcast to the room on this instance
//! 2. Queue for the broker exchange (other instances)
//! 3. Notify the downstream [`MessageEventHandler`]
//!
//! Events consumed from the exchange skip step 2.

use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::websocket::connection::ConnectionIdentity;
use crate::adapters::websocket::event_bridge::BrokerBridge;
use crate::adapters::websocket::messages::ClientFrame;
use crate::adapters::websocket::registry::{BroadcastReport, ConnectionRegistry};
use crate::domain::chat::MessageEvent;
use crate::domain::foundation::{RoomId, UserId};
use crate::ports::{AccessDenied, MessageEventHandler, MessageStore, PersistError, RoomAccess};

/// Errors from [`ChatRelay::post_message`].
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("message content is empty")]
    EmptyContent,

    #[error("message content is {size} bytes, limit is {limit}")]
    ContentTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Access(#[from] AccessDenied),

    #[error("message not stored: {0}")]
    Persist(#[from] PersistError),
}

/// Largest message accepted when no limit is configured, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

/// Application service shared by the gateway, the pumps and the consume loop.
pub struct ChatRelay {
    registry: Arc<ConnectionRegistry>,
    bridge: Arc<BrokerBridge>,
    access: Arc<dyn RoomAccess>,
    store: Arc<dyn MessageStore>,
    events: Arc<dyn MessageEventHandler>,
    max_message_size: usize,
}

impl ChatRelay {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        bridge: Arc<BrokerBridge>,
        access: Arc<dyn RoomAccess>,
        store: Arc<dyn MessageStore>,
        events: Arc<dyn MessageEventHandler>,
    ) -> Self {
        Self {
            registry,
            bridge,
            access,
            store,
            events,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Sets the content limit for [`ChatRelay::post_message`]. Matches the socket frame limit.
    pub fn with_max_message_size(mut self, limit: usize) -> Self {
        self.max_message_size = limit;
        self
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn bridge(&self) -> &Arc<BrokerBridge> {
        &self.bridge
    }

    /// Resolves the username for `user_id` in `room_id`.
    pub async fn authorize(&self, user_id: UserId, room_id: RoomId) -> Result<String, AccessDenied> {
        self.access.authorize_user_for_room(user_id, room_id).await
    }

    /// Handles a chat frame read from a connection.
    ///
    /// A storage failure does not stop delivery; the event just goes out
    /// without a `message_id`.
    pub async fn relay_inbound(
        &self,
        identity: &ConnectionIdentity,
        room_id: RoomId,
        frame: ClientFrame,
    ) -> MessageEvent {
        let mut event = self.new_message(identity, room_id, &frame.content);

        match self
            .store
            .persist_message(room_id, identity.user_id, &frame.content)
            .await
        {
            Ok(message_id) => event = event.with_data("message_id", message_id),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    room_id = %room_id,
                    user_id = %identity.user_id,
                    "Failed to persist message, relaying anyway"
                );
            }
        }

        if let Some(temp_id) = frame.temp_id {
            event = event.with_data("temp_id", temp_id);
        }

        self.fan_out(&event).await;
        event
    }

    /// Handles a message submitted over HTTP.
    pub async fn post_message(
        &self,
        user_id: UserId,
        room_id: RoomId,
        content: &str,
    ) -> Result<MessageEvent, RelayError> {
        if content.trim().is_empty() {
            return Err(RelayError::EmptyContent);
        }
        if content.len() > self.max_message_size {
            return Err(RelayError::ContentTooLarge {
                size: content.len(),
                limit: self.max_message_size,
            });
        }

        let username = self.authorize(user_id, room_id).await?;
        let message_id = self.store.persist_message(room_id, user_id, content).await?;

        let identity = ConnectionIdentity::new(user_id, username);
        let event = self
            .new_message(&identity, room_id, content)
            .with_data("message_id", message_id);

        self.fan_out(&event).await;
        Ok(event)
    }

    pub async fn announce_connected(&self, identity: &ConnectionIdentity, room_id: RoomId) {
        let event = MessageEvent::user_connected(room_id, identity.user_id, identity.username.clone())
            .with_origin(self.bridge.instance_id().clone());
        self.fan_out(&event).await;
    }

    pub async fn announce_disconnected(&self, identity: &ConnectionIdentity, room_id: RoomId) {
        let event =
            MessageEvent::user_disconnected(room_id, identity.user_id, identity.username.clone())
                .with_origin(self.bridge.instance_id().clone());
        self.fan_out(&event).await;
    }

    fn new_message(
        &self,
        identity: &ConnectionIdentity,
        room_id: RoomId,
        content: &str,
    ) -> MessageEvent {
        MessageEvent::new_message(room_id, identity.user_id, identity.username.clone(), content)
            .with_origin(self.bridge.instance_id().clone())
    }

    async fn fan_out(&self, event: &MessageEvent) {
        self.deliver_locally(event).await;
        self.bridge.publish(event);
        self.events.handle(event.clone()).await;
    }

    async fn deliver_locally(&self, event: &MessageEvent) -> BroadcastReport {
        match event.to_frame() {
            Ok(frame) => self.registry.broadcast_to_room(event.room_id(), &frame).await,
            Err(e) => {
                tracing::error!(error = %e, kind = %event.kind(), "Failed to serialize event");
                BroadcastReport::default()
            }
        }
    }
}

/// Consumed events from other instances land here.
#[async_trait]
impl MessageEventHandler for ChatRelay {
    async fn handle(&self, event: MessageEvent) {
        let report = self.deliver_locally(&event).await;
        tracing::debug!(
            room_id = %event.room_id(),
            kind = %event.kind(),
            delivered = report.delivered,
            "Delivered event from exchange"
        );
        self.events.handle(event).await;
    }

    fn name(&self) -> &'static str {
        "ChatRelay"
    }
}
