//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, and validation errors
//! that form the vocabulary of the chat domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConnectionId, InstanceId, RoomId, UserId};
pub use timestamp::Timestamp;
