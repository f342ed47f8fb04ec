//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the fanout core and the outside world. Adapters implement these ports.
//!
//! ## Transport
//!
//! - `MessageBroker` - Shared fanout exchange for cross-instance delivery
//!
//! ## Collaborators consumed by the core
//!
//! - `RoomAccess` - Resolve and authorize a user for a room
//! - `MessageStore` - Persist an accepted message and return its id
//!
//! ## Collaborators exposed by the core
//!
//! - `MessageEventHandler` - Callback per locally-originated or consumed event

mod event_handler;
mod message_broker;
mod message_store;
mod room_access;

pub use event_handler::MessageEventHandler;
pub use message_broker::{BrokerError, BrokerSubscription, MessageBroker};
pub use message_store::{MessageStore, PersistError};
pub use room_access::{AccessDenied, RoomAccess};
