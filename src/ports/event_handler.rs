//! MessageEventHandler port - callback invoked per chat event.
//!
//! The fanout core hands every locally-originated or broker-consumed
//! `MessageEvent` to a handler so the surrounding system can persist,
//! index, or log it.

use async_trait::async_trait;

use crate::domain::chat::MessageEvent;

/// Handler for chat events flowing through this instance.
///
/// Implementations should be:
/// - **Quick** - the consume loop awaits each call in order
/// - **Infallible from the caller's view** - failures are handled inside
///
/// # Example
///
/// ```ignore
/// struct Indexer { /* ... */ }
///
/// #[async_trait]
/// impl MessageEventHandler for Indexer {
///     async fn handle(&self, event: MessageEvent) {
///         self.index(event.room_id(), event.content()).await;
///     }
///
///     fn name(&self) -> &'static str {
///         "Indexer"
///     }
/// }
/// ```
#[async_trait]
pub trait MessageEventHandler: Send + Sync {
    /// Process one event.
    async fn handle(&self, event: MessageEvent);

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_handler_object_safe(_: &dyn MessageEventHandler) {}

    #[allow(dead_code)]
    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn message_event_handler_is_send_sync() {
        #[allow(dead_code)]
        fn check<T: MessageEventHandler>() {
            assert_send_sync::<T>();
        }
    }
}
