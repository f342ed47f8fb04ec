//! Chat Fanout - real-time chat rooms across server instances
//!
//! This crate tracks live WebSocket connections grouped by room, relays
//! messages among room members, and bridges local traffic to a shared
//! broker exchange so a message posted on one instance reaches clients
//! connected to every other instance.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
