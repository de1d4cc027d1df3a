//! # emotion-relay
//!
//! Real-time relay between a streaming client and an emotion detector.
//!
//! A client opens a WebSocket at `/ws` and sends video frames as
//! `{"data": {"image": "data:image/jpeg;base64,..."}}`. Each frame is
//! decoded, handed to the shared [`detection::EmotionDetector`], and
//! answered with either
//! `{"predictions": {"happy": 0.9, ...}, "emotion": "happy"}` or
//! `{"error": "..."}`. A bad frame never ends the session.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler + Session loop (ws/)
//!     ├── Health endpoints (api/)
//!     │
//!     ├── FrameProcessor (service/)
//!     │
//!     ├── EmotionDetector (detection/)
//!     └── ONNX Runtime models (feature `onnx`)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod detection;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
