//! Detector output: one entry per face found in a frame.

use super::EmotionScores;

/// Axis-aligned face bounding box in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Box width.
    pub width: u32,
    /// Box height.
    pub height: u32,
}

/// A face found by the detector, with its emotion distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    /// Where the face is, when the detector reports it.
    pub bounding_box: Option<FaceBox>,
    /// Confidence per emotion label.
    pub emotions: EmotionScores,
}

impl DetectedFace {
    /// Creates a face with scores and no location.
    #[must_use]
    pub const fn new(emotions: EmotionScores) -> Self {
        Self {
            bounding_box: None,
            emotions,
        }
    }

    /// Attaches a bounding box.
    #[must_use]
    pub fn with_box(mut self, bounding_box: FaceBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}
