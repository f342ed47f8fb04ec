//! Application layer - services that coordinate the fanout core.
//!
//! The relay sits between the socket edge, the room registry, the broker
//! bridge and the collaborator ports.

pub mod relay;

pub use relay::{ChatRelay, RelayError, DEFAULT_MAX_MESSAGE_SIZE};
