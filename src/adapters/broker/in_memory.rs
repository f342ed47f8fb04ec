//! In-memory fanout broker for testing and single-node development.
//!
//! Every subscription gets its own receiver on a `tokio::sync::broadcast`
//! channel, which mirrors a fanout exchange with one queue per instance.
//!
//! # Security Note
//!
//! This adapter is for **testing and local development only**. It uses
//! `.expect()` on lock operations which will panic if locks are poisoned.
//! Production deployments should use [`super::RedisBroker`].

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::sync::broadcast;

use crate::ports::{BrokerError, BrokerSubscription, MessageBroker};

const DEFAULT_CAPACITY: usize = 1024;

/// In-memory broker with fanout semantics.
///
/// Features:
/// - Independent subscription per `subscribe` call
/// - Publish capture for assertions
/// - Outage simulation (`set_available(false)`, `disconnect_subscribers`)
///
/// # Example
///
/// ```ignore
/// let broker = Arc::new(InMemoryBroker::new("chat_exchange"));
/// let mut sub = broker.subscribe().await?;
/// broker.publish(payload).await?;
/// assert_eq!(broker.published_count(), 1);
/// ```
pub struct InMemoryBroker {
    exchange: String,
    sender: Mutex<broadcast::Sender<String>>,
    published: RwLock<Vec<String>>,
    available: AtomicBool,
    capacity: usize,
}

impl InMemoryBroker {
    /// Creates a broker for the named exchange.
    pub fn new(exchange: impl Into<String>) -> Self {
        Self::with_capacity(exchange, DEFAULT_CAPACITY)
    }

    /// Creates a broker whose per-subscription buffer holds `capacity` payloads.
    pub fn with_capacity(exchange: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            exchange: exchange.into(),
            sender: Mutex::new(sender),
            published: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
            capacity,
        }
    }

    // === Test Helpers ===

    /// Returns every payload accepted by `publish`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn published(&self) -> Vec<String> {
        self.published
            .read()
            .expect("InMemoryBroker: published lock poisoned")
            .clone()
    }

    /// Returns count of accepted publishes.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn published_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryBroker: published lock poisoned")
            .len()
    }

    /// Number of live subscriptions.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .lock()
            .expect("InMemoryBroker: sender lock poisoned")
            .receiver_count()
    }

    /// Simulates the broker going away (`false`) or coming back (`true`).
    ///
    /// While unavailable, `publish` and `subscribe` fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Ends every live subscription stream, as a dropped connection would.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn disconnect_subscribers(&self) {
        let (sender, _) = broadcast::channel(self.capacity);
        *self
            .sender
            .lock()
            .expect("InMemoryBroker: sender lock poisoned") = sender;
    }

    fn ensure_available(&self) -> Result<(), BrokerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::Unavailable("in-memory broker offline".to_string()))
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new("chat_exchange")
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, payload: String) -> Result<(), BrokerError> {
        self.ensure_available()?;

        self.published
            .write()
            .expect("InMemoryBroker: published write lock poisoned")
            .push(payload.clone());

        // No subscribers is fine: a fanout exchange with no bound queues drops the message
        let _ = self
            .sender
            .lock()
            .expect("InMemoryBroker: sender lock poisoned")
            .send(payload);

        Ok(())
    }

    async fn subscribe(&self) -> Result<BrokerSubscription, BrokerError> {
        self.ensure_available()?;

        let receiver = self
            .sender
            .lock()
            .expect("InMemoryBroker: sender lock poisoned")
            .subscribe();

        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(payload) => return Some((Ok(payload), receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "In-memory subscription lagged, payloads dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream.boxed())
    }

    fn exchange(&self) -> &str {
        &self.exchange
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_every_subscription() {
        let broker = InMemoryBroker::default();
        let mut first = broker.subscribe().await.unwrap();
        let mut second = broker.subscribe().await.unwrap();

        broker.publish("hello".to_string()).await.unwrap();

        assert_eq!(first.next().await.unwrap().unwrap(), "hello");
        assert_eq!(second.next().await.unwrap().unwrap(), "hello");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let broker = InMemoryBroker::default();
        broker.publish("dropped".to_string()).await.unwrap();
        assert_eq!(broker.published_count(), 1);
    }

    #[tokio::test]
    async fn payloads_arrive_in_publish_order() {
        let broker = InMemoryBroker::default();
        let mut sub = broker.subscribe().await.unwrap();

        for i in 0..5 {
            broker.publish(format!("m{}", i)).await.unwrap();
        }

        for i in 0..5 {
            assert_eq!(sub.next().await.unwrap().unwrap(), format!("m{}", i));
        }
    }

    #[tokio::test]
    async fn unavailable_broker_rejects_publish_and_subscribe() {
        let broker = InMemoryBroker::default();
        broker.set_available(false);

        assert!(matches!(
            broker.publish("x".to_string()).await,
            Err(BrokerError::Unavailable(_))
        ));
        assert!(broker.subscribe().await.is_err());
        assert_eq!(broker.published_count(), 0);

        broker.set_available(true);
        assert!(broker.publish("x".to_string()).await.is_ok());
    }

    #[tokio::test]
    async fn disconnect_ends_live_subscriptions() {
        let broker = InMemoryBroker::default();
        let mut sub = broker.subscribe().await.unwrap();
        assert_eq!(broker.subscriber_count(), 1);

        broker.disconnect_subscribers();

        assert!(sub.next().await.is_none());
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[test]
    fn exchange_name_is_reported() {
        let broker = InMemoryBroker::new("rooms");
        assert_eq!(broker.exchange(), "rooms");
    }
}
