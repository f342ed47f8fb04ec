//! Redis pub/sub broker for multi-instance deployments.
//!
//! The exchange is a Redis channel. Redis delivers every PUBLISH to every
//! connection subscribed to the channel, so each instance's subscription
//! acts as its own queue bound to a fanout exchange. Subscriptions vanish
//! with their connection, the equivalent of auto-delete queues.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;

use crate::ports::{BrokerError, BrokerSubscription, MessageBroker};

/// Redis-backed fanout broker.
///
/// Publishing shares one multiplexed connection. It is re-established
/// lazily after a failure so a Redis restart only costs the messages
/// published while it was down.
pub struct RedisBroker {
    client: redis::Client,
    publisher: Mutex<Option<MultiplexedConnection>>,
    exchange: String,
}

impl RedisBroker {
    /// Connect to Redis and verify the publish connection.
    pub async fn connect(url: &str, exchange: impl Into<String>) -> Result<Self, BrokerError> {
        let client =
            redis::Client::open(url).map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        let publisher = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            publisher: Mutex::new(Some(publisher)),
            exchange: exchange.into(),
        })
    }

    async fn publisher(&self) -> Result<MultiplexedConnection, BrokerError> {
        let mut slot = self.publisher.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        tracing::info!(exchange = %self.exchange, "Redis publish connection re-established");
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl MessageBroker for RedisBroker {
    async fn publish(&self, payload: String) -> Result<(), BrokerError> {
        let mut conn = self.publisher().await?;

        let result: Result<i64, redis::RedisError> = conn.publish(&self.exchange, payload).await;
        match result {
            Ok(receivers) => {
                tracing::trace!(exchange = %self.exchange, receivers, "Published to exchange");
                Ok(())
            }
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    *self.publisher.lock().await = None;
                }
                Err(BrokerError::Publish(e.to_string()))
            }
        }
    }

    async fn subscribe(&self) -> Result<BrokerSubscription, BrokerError> {
        let conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

        let mut pubsub = conn.into_pubsub();
        pubsub
            .subscribe(&self.exchange)
            .await
            .map_err(|e| BrokerError::Subscribe(e.to_string()))?;

        tracing::info!(exchange = %self.exchange, "Subscribed to exchange");

        let stream = pubsub.into_on_message().map(|msg| {
            msg.get_payload::<String>()
                .map_err(|e| BrokerError::Subscribe(e.to_string()))
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
    async fn connect_rejects_malformed_url() {
        let result = RedisBroker::connect("not-a-url", "chat_exchange").await;
        assert!(matches!(result, Err(BrokerError::Unavailable(_))));
    }
}
