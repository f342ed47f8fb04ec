//! Directory adapters - implementations of the collaborator ports.
//!
//! - `InMemoryDirectory` - Users, rooms and message store held in memory

mod in_memory;

pub use in_memory::{InMemoryDirectory, StoredMessage};
