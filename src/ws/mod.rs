//! WebSocket layer: upgrade handling, session loop, wire messages.
//!
//! The endpoint at `/ws` accepts one long-lived session per client. Each
//! inbound text frame is answered with exactly one JSON object.

pub mod handler;
pub mod messages;
pub mod session;
