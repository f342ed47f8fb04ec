//! Adapters - Implementations of port interfaces and the network edge.
//!
//! Adapters connect the fanout core to external systems:
//! - `broker` - Fanout exchange implementations (in-memory, Redis pub/sub)
//! - `directory` - In-memory room access and message store
//! - `events` - Message event handlers (logging, recording)
//! - `http` - Router, health and REST message endpoint
//! - `websocket` - Connections, rooms, pumps and the broker bridge

pub mod broker;
pub mod directory;
pub mod events;
pub mod http;
pub mod websocket;

pub use broker::{InMemoryBroker, RedisBroker};
pub use directory::InMemoryDirectory;
pub use events::{LoggingEventHandler, RecordingEventHandler};
