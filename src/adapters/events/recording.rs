//! Handler that captures chat events for test assertions.
//!
//! # Security Note
//!
//! This adapter is for **testing only**. It uses `.expect()` on lock
//! operations which will panic if locks are poisoned.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::chat::{EventKind, MessageEvent};
use crate::ports::MessageEventHandler;

/// Records every handled event in arrival order.
///
/// # Example
///
/// ```ignore
/// let recorder = Arc::new(RecordingEventHandler::new());
/// relay_with(recorder.clone()).relay_inbound(...).await;
/// assert_eq!(recorder.event_count(), 1);
/// ```
#[derive(Default)]
pub struct RecordingEventHandler {
    events: RwLock<Vec<MessageEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn events(&self) -> Vec<MessageEvent> {
        self.events
            .read()
            .expect("RecordingEventHandler: events lock poisoned")
            .clone()
    }

    /// Returns recorded events of one kind.
    pub fn events_of_kind(&self, kind: &EventKind) -> Vec<MessageEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind() == kind)
            .collect()
    }

    /// Returns count of recorded events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn event_count(&self) -> usize {
        self.events
            .read()
            .expect("RecordingEventHandler: events lock poisoned")
            .len()
    }
}

#[async_trait]
impl MessageEventHandler for RecordingEventHandler {
    async fn handle(&self, event: MessageEvent) {
        self.events
            .write()
            .expect("RecordingEventHandler: events write lock poisoned")
            .push(event);
    }

    fn name(&self) -> &'static str {
        "RecordingEventHandler"
    }
}
