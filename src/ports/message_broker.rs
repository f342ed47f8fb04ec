//! MessageBroker port - Interface for the shared cross-instance exchange.
//!
//! Every server instance publishes locally-originated chat events to one
//! named fanout exchange and holds its own subscription bound to it, so a
//! message published anywhere reaches every instance.
//!
//! ```text
//!  instance A ──publish──▶ ┌──────────────┐ ──▶ subscription A
//!                          │ chat_exchange│ ──▶ subscription B
//!  instance B ──publish──▶ └──────────────┘ ──▶ subscription C
//! ```
//!
//! A single subscription shared competitively by all instances would deliver
//! each message to only one of them, so adapters must give every caller of
//! [`MessageBroker::subscribe`] an independent copy of the stream.

use async_trait::async_trait;
use futures::stream::BoxStream;

/// A live subscription: raw payloads in publish order.
///
/// The stream ends when the underlying broker connection is lost.
pub type BrokerSubscription = BoxStream<'static, Result<String, BrokerError>>;

/// Errors that can occur when talking to the broker.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Broker could not be reached or the connection dropped.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// Broker rejected a publish.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Subscription could not be established or yielded a bad delivery.
    #[error("Subscription failed: {0}")]
    Subscribe(String),
}

/// Port for the shared fanout exchange.
///
/// Implementations must ensure:
/// - `publish` delivers the payload to every live subscription (fanout)
/// - each `subscribe` call yields an independent subscription
/// - payloads are delivered unchanged
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish one serialized envelope to the exchange.
    async fn publish(&self, payload: String) -> Result<(), BrokerError>;

    /// Bind a new per-instance subscription to the exchange.
    async fn subscribe(&self) -> Result<BrokerSubscription, BrokerError>;

    /// Exchange name, for logging.
    fn exchange(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn MessageBroker) {}

    #[test]
    fn broker_error_messages_include_cause() {
        let err = BrokerError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "Broker unavailable: connection refused");
    }
}
