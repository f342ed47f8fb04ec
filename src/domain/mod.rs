//! Domain layer containing chat types shared by every adapter.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, validation errors)
//! - `chat` - Message envelope, outbound frames, connection lifecycle

pub mod chat;
pub mod foundation;
