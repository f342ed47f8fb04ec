//! Per-connection read and write pumps.
//!
//! ```text
//!            socket
//!     ┌────────┴─────────┐
//!     ▼                  ▲
//! read pump          write pump (spawned)
//!  │ touch             │ outbox frames
//!  │ relay_inbound     │ ping every ping_interval
//!  ▼                   │ close frame once outbox closes
//! ChatRelay            │
//!     └── Lifecycle (watch) ──┘
//! ```
//!
//! Either pump ending moves the lifecycle to `Closing`, as does eviction by
//! the registry. The read pump then unregisters the connection, which closes
//! the outbox and lets the write pump finish with a close frame.
//!
//! Both pumps are generic over `futures` sinks and streams of axum
//! [`Message`]s so they can be driven by channels in tests.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::application::relay::{ChatRelay, DEFAULT_MAX_MESSAGE_SIZE};
use crate::domain::foundation::{ConnectionId, RoomId};

use super::connection::{ConnectionIdentity, Lifecycle, Outbox};
use super::messages::ClientFrame;

/// Heartbeat and framing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSettings {
    /// How often the write pump pings the client.
    pub ping_interval: Duration,
    /// Longest silence tolerated from the client before the connection is dropped.
    pub pong_wait: Duration,
    /// Deadline for a single socket write.
    pub write_wait: Duration,
    /// Largest inbound text frame accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(54),
            pong_wait: Duration::from_secs(60),
            write_wait: Duration::from_secs(10),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// A registered connection as seen by its pumps.
#[derive(Debug, Clone)]
pub struct ConnectionSession {
    pub id: ConnectionId,
    pub identity: ConnectionIdentity,
    pub room_id: RoomId,
    pub lifecycle: Lifecycle,
}

#[derive(Debug, thiserror::Error)]
enum WriteError {
    #[error("write deadline exceeded")]
    Deadline,
    #[error("socket write failed: {0}")]
    Socket(String),
}

/// Runs both pumps until the connection is torn down.
///
/// The write pump is spawned onto its own task; the read pump runs on the
/// caller's task. Returns after the connection is unregistered and the
/// write pump has stopped.
pub async fn run_connection<S, SE, R, RE>(
    sink: S,
    stream: R,
    outbox: Outbox,
    session: ConnectionSession,
    relay: Arc<ChatRelay>,
    settings: PumpSettings,
) where
    S: Sink<Message, Error = SE> + Unpin + Send + 'static,
    SE: Display + Send + 'static,
    R: Stream<Item = Result<Message, RE>> + Unpin,
    RE: Display,
{
    session.lifecycle.activate();

    let writer = tokio::spawn(write_pump(
        sink,
        outbox,
        session.id,
        session.lifecycle.clone(),
        settings,
    ));

    read_pump(stream, &session, &relay, settings).await;

    // The registry may already have evicted this connection. Replaced
    // connections leave without a departure event.
    relay.registry().unregister(session.id).await;
    if !session.lifecycle.was_replaced() {
        relay
            .announce_disconnected(&session.identity, session.room_id)
            .await;
    }

    if let Err(e) = writer.await {
        tracing::error!(connection_id = %session.id, error = %e, "Write pump panicked");
    }

    session.lifecycle.close();
    tracing::info!(
        connection_id = %session.id,
        user_id = %session.identity.user_id,
        room_id = %session.room_id,
        "Connection closed"
    );
}

async fn read_pump<R, RE>(
    mut stream: R,
    session: &ConnectionSession,
    relay: &ChatRelay,
    settings: PumpSettings,
) where
    R: Stream<Item = Result<Message, RE>> + Unpin,
    RE: Display,
{
    let id = session.id;

    loop {
        let next = tokio::select! {
            _ = session.lifecycle.terminating() => break,
            next = tokio::time::timeout(settings.pong_wait, stream.next()) => next,
        };

        let message = match next {
            Err(_) => {
                tracing::info!(connection_id = %id, "Read deadline expired");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(connection_id = %id, error = %e, "Socket read failed");
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                if text.len() > settings.max_message_size {
                    tracing::warn!(
                        connection_id = %id,
                        size = text.len(),
                        limit = settings.max_message_size,
                        "Inbound message too large"
                    );
                    break;
                }
                if !relay.registry().touch(id).await {
                    tracing::debug!(connection_id = %id, "Dropping frame from evicted connection");
                    break;
                }
                match ClientFrame::parse(&text) {
                    Some(frame) => {
                        relay
                            .relay_inbound(&session.identity, session.room_id, frame)
                            .await;
                    }
                    None => tracing::trace!(connection_id = %id, "Ignoring empty frame"),
                }
            }
            Message::Binary(_) => {
                tracing::warn!(connection_id = %id, "Received unsupported binary message");
            }
            Message::Ping(_) | Message::Pong(_) => {
                relay.registry().touch(id).await;
            }
            Message::Close(_) => {
                tracing::debug!(connection_id = %id, "Client sent close frame");
                break;
            }
        }
    }

    session.lifecycle.begin_closing();
}

async fn write_pump<S, SE>(
    mut sink: S,
    mut outbox: Outbox,
    id: ConnectionId,
    lifecycle: Lifecycle,
    settings: PumpSettings,
) where
    S: Sink<Message, Error = SE> + Unpin,
    SE: Display,
{
    let mut heartbeat = interval_at(
        Instant::now() + settings.ping_interval,
        settings.ping_interval,
    );
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = outbox.next() => match frame {
                Some(frame) => {
                    let message = Message::Text(frame.as_str().to_string());
                    if let Err(e) = send(&mut sink, message, settings.write_wait).await {
                        tracing::debug!(connection_id = %id, error = %e, "Write failed, closing");
                        break;
                    }
                }
                None => {
                    // Unregistered or evicted
                    let _ = send(&mut sink, Message::Close(None), settings.write_wait).await;
                    break;
                }
            },
            _ = heartbeat.tick() => {
                if let Err(e) = send(&mut sink, Message::Ping(Vec::new()), settings.write_wait).await {
                    tracing::debug!(connection_id = %id, error = %e, "Ping failed, closing");
                    break;
                }
            }
        }
    }

    lifecycle.begin_closing();
}

async fn send<S, SE>(sink: &mut S, message: Message, deadline: Duration) -> Result<(), WriteError>
where
    S: Sink<Message, Error = SE> + Unpin,
    SE: Display,
{
    match tokio::time::timeout(deadline, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WriteError::Socket(e.to_string())),
        Err(_) => Err(WriteError::Deadline),
    }
}
