//! Handler that writes every chat event to the structured log.

use async_trait::async_trait;

use crate::domain::chat::MessageEvent;
use crate::ports::MessageEventHandler;

/// Logs each event at `info` with its routing fields.
///
/// The default downstream handler when the surrounding system registers
/// nothing else.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventHandler;

impl LoggingEventHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageEventHandler for LoggingEventHandler {
    async fn handle(&self, event: MessageEvent) {
        tracing::info!(
            event_type = %event.kind(),
            room_id = %event.room_id(),
            user_id = %event.user_id(),
            username = %event.username(),
            origin = event.origin().map(|o| o.as_str()).unwrap_or("-"),
            "Chat event: {}",
            event.content()
        );
    }

    fn name(&self) -> &'static str {
        "LoggingEventHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{RoomId, UserId};

    #[tokio::test]
    async fn handles_event_without_panicking() {
        let handler = LoggingEventHandler::new();
        let event = MessageEvent::new_message(
            RoomId::new(1).unwrap(),
            UserId::new(1).unwrap(),
            "alice",
            "hi",
        );
        handler.handle(event).await;
        assert_eq!(handler.name(), "LoggingEventHandler");
    }
}
