//! Service layer: frame decoding and response shaping.
//!
//! [`FrameProcessor`] turns one inbound text message into one
//! [`crate::ws::messages::OutboundMessage`], delegating inference to the
//! shared [`crate::detection::EmotionDetector`].

pub mod frame_processor;

pub use frame_processor::FrameProcessor;
