//! Emotion detection seam.
//!
//! The relay treats the detector as a black box: an image goes in, a list of
//! faces with emotion scores comes out. One instance is built at startup and
//! shared by every session, so implementations must be safe to call from
//! several threads at once.

#[cfg(feature = "onnx")]
pub mod onnx;

use std::fmt;
use std::path::PathBuf;

use crate::domain::{DecodedImage, DetectedFace};

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmotionDetector;

/// Errors raised by an [`EmotionDetector`].
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    /// A model file could not be loaded.
    #[error("failed to load model {path}: {message}")]
    ModelLoad {
        /// Path of the model file.
        path: PathBuf,
        /// Underlying runtime message.
        message: String,
    },

    /// The inference runtime failed while running a model.
    #[error("inference failed: {0}")]
    Inference(String),

    /// A model produced output of an unexpected shape or size.
    #[error("unexpected model output: {0}")]
    InvalidOutput(String),

    /// A model session lock was poisoned by a panic in another call.
    #[error("model session unavailable")]
    Poisoned,
}

/// Maps an image to zero or more faces, each with an emotion distribution.
///
/// Faces are returned in the detector's preferred order; callers that only
/// want one face take the first.
pub trait EmotionDetector: Send + Sync + fmt::Debug {
    /// Runs detection and classification on one frame.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectorError`] if inference fails.
    fn detect_emotions(&self, image: &DecodedImage) -> Result<Vec<DetectedFace>, DetectorError>;
}
