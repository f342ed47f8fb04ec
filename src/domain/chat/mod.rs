//! Chat domain - events exchanged between rooms, connections and instances.

mod connection_state;
mod frame;
mod message_event;

pub use connection_state::ConnectionState;
pub use frame::Frame;
pub use message_event::{EventKind, MessageEvent};
