//! One live client connection: identity, bounded outbox and lifecycle.
//!
//! ```text
//!          Connection::new
//!                │
//!      ┌─────────┴──────────┐
//!      ▼                    ▼
//!  Connection            Outbox
//!  (outbox sender,       (receiver, owned by
//!   moved into the        the write pump)
//!   registry)
//! ```
//!
//! The registry holds the only sender. Removing the connection from the
//! registry drops it, which the write pump observes as a closed outbox.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::domain::chat::{ConnectionState, Frame};
use crate::domain::foundation::{ConnectionId, UserId};

/// Who is on the other end of the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    pub user_id: UserId,
    pub username: String,
}

impl ConnectionIdentity {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Shared view of a connection's lifecycle state.
///
/// Both pumps hold a clone. Transitions only move forward, so racing
/// teardown paths may call [`Lifecycle::begin_closing`] and
/// [`Lifecycle::close`] any number of times.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: Arc<watch::Sender<ConnectionState>>,
    replaced: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            state: Arc::new(state),
            replaced: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Applies `next` if it is a valid forward transition. Returns whether it applied.
    pub fn advance(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                *current = next;
                true
            } else {
                false
            }
        })
    }

    /// Both pumps are running.
    pub fn activate(&self) -> bool {
        self.advance(ConnectionState::Active)
    }

    /// A pump hit a terminal condition.
    pub fn begin_closing(&self) -> bool {
        self.advance(ConnectionState::Closing)
    }

    /// The socket is released and the registry no longer knows the connection.
    pub fn close(&self) {
        self.begin_closing();
        self.advance(ConnectionState::Closed);
    }

    /// Records that a newer connection for the same user and room took over.
    pub fn mark_replaced(&self) {
        self.replaced.store(true, Ordering::SeqCst);
    }

    /// The user is still present through the replacing connection.
    pub fn was_replaced(&self) -> bool {
        self.replaced.load(Ordering::SeqCst)
    }

    /// Resolves once teardown has begun.
    pub async fn terminating(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|state| state.is_terminating()).await;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a connection's outbound queue.
#[derive(Debug)]
pub struct Outbox {
    receiver: mpsc::Receiver<Frame>,
}

impl Outbox {
    /// Waits for the next frame. `None` once the queue is closed and drained.
    pub async fn next(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Non-blocking poll, mainly for tests.
    pub fn try_next(&mut self) -> Result<Frame, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// A connection ready to be registered.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    identity: ConnectionIdentity,
    outbox: mpsc::Sender<Frame>,
    lifecycle: Lifecycle,
}

impl Connection {
    /// Creates a connection with an outbox holding at most `capacity` frames.
    pub fn new(identity: ConnectionIdentity, capacity: usize) -> (Self, Outbox) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let connection = Self {
            id: ConnectionId::new(),
            identity,
            outbox: sender,
            lifecycle: Lifecycle::new(),
        };
        (connection, Outbox { receiver })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub(crate) fn into_parts(
        self,
    ) -> (ConnectionId, ConnectionIdentity, mpsc::Sender<Frame>, Lifecycle) {
        (self.id, self.identity, self.outbox, self.lifecycle)
    }
}
