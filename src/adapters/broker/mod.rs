//! Broker adapters.
//!
//! - `RedisBroker` - Redis pub/sub channel as the shared fanout exchange
//! - `InMemoryBroker` - In-process fanout for tests and single-node runs

mod in_memory;
mod redis;

pub use in_memory::InMemoryBroker;
pub use self::redis::RedisBroker;
