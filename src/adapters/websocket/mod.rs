//! WebSocket adapters for real-time chat rooms.
//!
//! This module tracks live client connections grouped by room, relays
//! frames among room members, and bridges local traffic to the shared
//! broker exchange so every instance sees every message.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Broker exchange (fanout)                       │
//! │   InMemoryBroker (test) │ RedisBroker (production)                  │
//! └─────────────────────────────────────────────────────────────────────┘
//!            ▲ publish queue                  │ per-instance subscription
//!            │                                ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         BrokerBridge                                 │
//! │   - One publisher task, submission order preserved                   │
//! │   - Consume loop with resubscribe, skips this instance's events      │
//! └─────────────────────────────────────────────────────────────────────┘
//!            ▲                                │
//!            │           ChatRelay            ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      ConnectionRegistry                              │
//! │   Room 5             Room 7             Room 9                       │
//! │   ├── conn-a         ├── conn-d         └── conn-g                   │
//! │   ├── conn-b         └── conn-e                                      │
//! │   └── conn-c                                                         │
//! └─────────────────────────────────────────────────────────────────────┘
//!            │ bounded outbox per connection
//!            ▼
//!     write pump → socket → read pump → ChatRelay
//! ```
//!
//! # Components
//!
//! - [`connection`] - Connection identity, outbox and lifecycle
//! - [`rooms`] - Room membership and the per-user uniqueness index
//! - [`registry`] - Registry with room and global broadcast
//! - [`pumps`] - Read/write pumps with heartbeat
//! - [`event_bridge`] - Bridge between rooms and the broker exchange
//! - [`messages`] - Client frame and error body types
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod connection;
pub mod event_bridge;
pub mod handler;
pub mod messages;
pub mod pumps;
pub mod registry;
pub mod rooms;

pub use connection::{Connection, ConnectionIdentity, Lifecycle, Outbox};
pub use event_bridge::{BridgeOptions, BrokerBridge};
pub use handler::{ws_handler, GatewayRejection, GatewaySettings, WebSocketState, USER_ID_HEADER};
pub use messages::{ClientFrame, ErrorResponse};
pub use pumps::{run_connection, ConnectionSession, PumpSettings};
pub use registry::{
    BroadcastReport, ConnectionInfo, ConnectionRegistry, JoinOutcome, RegistryStats,
};
pub use rooms::RoomMembership;
