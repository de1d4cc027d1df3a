//! Domain layer: frames, faces, and emotion scores.
//!
//! These types carry no transport or inference concerns. The detector
//! produces [`DetectedFace`]s from a [`DecodedImage`], and the frame
//! processor shapes the first one into a response.

pub mod emotion;
pub mod face;
pub mod frame;

pub use emotion::{Emotion, EmotionScores};
pub use face::{DetectedFace, FaceBox};
pub use frame::DecodedImage;
