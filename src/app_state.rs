//! Shared application state injected into all Axum handlers.

use crate::service::FrameProcessor;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Frame processor holding the shared detector.
    pub processor: FrameProcessor,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_bytes: usize,
}
