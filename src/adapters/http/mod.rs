//! HTTP adapter - router, health and REST message endpoint.
//!
//! - `GET /health` - Registry stats for this instance
//! - `GET /api/ws` - WebSocket upgrade (see [`crate::adapters::websocket::handler`])
//! - `POST /api/rooms/:room_id/messages` - Post a message without a socket

pub mod handlers;
pub mod routes;

pub use handlers::{HealthResponse, PostMessageRequest};
pub use routes::build_router;
