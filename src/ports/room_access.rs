//! RoomAccess port - "resolve and authorize a user for a room".
//!
//! Implemented by the account/room service outside the fanout core. The
//! gateway calls it once per upgrade request; the relay calls it for
//! REST-originated posts.
//!
//! Implementations are assumed synchronous and fast; the core never retries.

use async_trait::async_trait;

use crate::domain::foundation::{RoomId, UserId};

/// Why a user may not enter a room.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    /// The user does not exist or is not allowed into the room.
    #[error("unauthorized")]
    Unauthorized,

    /// The room does not exist.
    #[error("room not found")]
    RoomNotFound,
}

/// Port for identity resolution and room authorization.
#[async_trait]
pub trait RoomAccess: Send + Sync {
    /// Returns the user's display name when `user_id` may join `room_id`.
    async fn authorize_user_for_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<String, AccessDenied>;
}
