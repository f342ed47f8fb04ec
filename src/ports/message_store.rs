//! MessageStore port - "persist an accepted message and return its identifier".
//!
//! Message history lives in the surrounding application's database; the
//! fanout core only needs the identifier so clients can reconcile
//! optimistic messages with persisted ones.

use async_trait::async_trait;

use crate::domain::foundation::{RoomId, UserId};

/// Errors that can occur while persisting a message.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PersistError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Message rejected: {0}")]
    Rejected(String),
}

/// Port for message persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Store one accepted message and return its identifier.
    async fn persist_message(
        &self,
        room_id: RoomId,
        user_id: UserId,
        content: &str,
    ) -> Result<u64, PersistError>;
}
