//! Bridge between local rooms and the shared broker exchange.
//!
//! # Event Flow
//!
//! ```text
//!  ChatRelay                                  other instances
//!     │ publish(event)                               ▲
//!     ▼                                              │
//! ┌──────────────────┐   one task   ┌────────────────┴───┐
//! │  publish queue   │ ───────────▶ │  broker exchange   │
//! │  (bounded mpsc)  │              │  (fanout)          │
//! └──────────────────┘              └────────────────┬───┘
//!                                                    │ this instance's
//!                                                    ▼ subscription
//!                                   ┌────────────────────┐
//!                                   │  consume loop      │
//!                                   │  skip own origin   │
//!                                   └────────────────────┘
//!                                                    │
//!                                                    ▼
//!                                     MessageEventHandler::handle
//! ```
//!
//! Publishing never waits on the broker. A single publisher task drains
//! the queue so events leave in the order they were submitted. If the
//! broker is down, events are logged and dropped and local delivery
//! carries on.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::domain::chat::MessageEvent;
use crate::domain::foundation::InstanceId;
use crate::ports::{MessageBroker, MessageEventHandler};

/// Tuning for [`BrokerBridge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Events waiting for the publisher task before new ones are dropped.
    pub publish_queue_capacity: usize,
    /// Pause between a lost subscription and the next attempt.
    pub reconnect_delay: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            publish_queue_capacity: 1024,
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

/// Publishes local events to the exchange and feeds consumed events back in.
pub struct BrokerBridge {
    broker: Arc<dyn MessageBroker>,
    instance_id: InstanceId,
    queue: mpsc::Sender<String>,
    reconnect_delay: Duration,
}

impl BrokerBridge {
    /// Creates the bridge and spawns its publisher task.
    ///
    /// Must be called inside a tokio runtime. The publisher task exits
    /// once the bridge is dropped and the queue is drained.
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        instance_id: InstanceId,
        options: BridgeOptions,
    ) -> Self {
        let (queue, pending) = mpsc::channel(options.publish_queue_capacity.max(1));
        tokio::spawn(run_publisher(broker.clone(), pending));

        Self {
            broker,
            instance_id,
            queue,
            reconnect_delay: options.reconnect_delay,
        }
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    pub fn exchange(&self) -> &str {
        self.broker.exchange()
    }

    /// Queues `event` for the exchange. Never blocks.
    ///
    /// Events without an origin are stamped with this instance.
    pub fn publish(&self, event: &MessageEvent) {
        let payload = if event.origin().is_some() {
            event.to_json()
        } else {
            event.clone().with_origin(self.instance_id.clone()).to_json()
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, kind = %event.kind(), "Failed to serialize event");
                return;
            }
        };

        match self.queue.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    room_id = %event.room_id(),
                    kind = %event.kind(),
                    "Publish queue full, event dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!(kind = %event.kind(), "Publisher task gone, event dropped");
            }
        }
    }

    /// Spawns the consume loop for this instance's subscription.
    ///
    /// Every consumed event not published by this instance goes to
    /// `handler`. A failed or ended subscription is retried after the
    /// reconnect delay. The loop runs until the task is aborted.
    pub fn consume(&self, handler: Arc<dyn MessageEventHandler>) -> JoinHandle<()> {
        let broker = self.broker.clone();
        let instance_id = self.instance_id.clone();
        let delay = self.reconnect_delay;

        tokio::spawn(async move {
            loop {
                match broker.subscribe().await {
                    Ok(mut subscription) => {
                        tracing::info!(
                            exchange = broker.exchange(),
                            handler = handler.name(),
                            "Consuming from exchange"
                        );
                        while let Some(item) = subscription.next().await {
                            match item {
                                Ok(payload) => {
                                    dispatch(&instance_id, handler.as_ref(), &payload).await
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "Broker delivery failed");
                                }
                            }
                        }
                        tracing::warn!(
                            exchange = broker.exchange(),
                            "Subscription ended, resubscribing"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            exchange = broker.exchange(),
                            retry_in_ms = delay.as_millis() as u64,
                            "Subscribe failed"
                        );
                    }
                }
                tokio::time::sleep(delay).await;
            }
        })
    }
}

async fn run_publisher(broker: Arc<dyn MessageBroker>, mut pending: mpsc::Receiver<String>) {
    while let Some(payload) = pending.recv().await {
        if let Err(e) = broker.publish(payload).await {
            tracing::warn!(
                error = %e,
                exchange = broker.exchange(),
                "Publish failed, event dropped"
            );
        }
    }
    tracing::debug!("Publisher task stopped");
}

/// Decodes one consumed payload and hands it to `handler`.
async fn dispatch(instance_id: &InstanceId, handler: &dyn MessageEventHandler, payload: &str) {
    let event = match MessageEvent::from_json(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed payload from exchange, dropped");
            return;
        }
    };

    if event.originated_at(instance_id) {
        tracing::trace!(room_id = %event.room_id(), "Skipping own event");
        return;
    }

    handler.handle(event).await;
}
