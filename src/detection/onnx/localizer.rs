//! Face localisation stage: BlazeFace-style short-range model.
//!
//! Pure pre/post-processing around the model call: resize to the model
//! input, decode anchor-relative boxes, threshold, and suppress overlaps.

use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::domain::FaceBox;

/// Model input resolution (square).
pub const INPUT_SIZE: u32 = 128;

/// Number of anchors in the short-range model.
pub const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output (box + 6 keypoints).
const REGRESSOR_STRIDE: usize = 16;

/// IoU above which the lower-scoring box is dropped.
const NMS_IOU_THRESHOLD: f32 = 0.3;

/// A scored box in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
    /// Sigmoid confidence.
    pub score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Converts to an integer box, clamped to the frame.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn to_face_box(&self, frame_width: u32, frame_height: u32) -> FaceBox {
        let x = (self.x1.max(0.0) as u32).min(frame_width.saturating_sub(1));
        let y = (self.y1.max(0.0) as u32).min(frame_height.saturating_sub(1));
        let x2 = (self.x2.max(0.0) as u32).min(frame_width);
        let y2 = (self.y2.max(0.0) as u32).min(frame_height);
        FaceBox {
            x,
            y,
            width: x2.saturating_sub(x).max(1),
            height: y2.saturating_sub(y).max(1),
        }
    }
}

/// Resizes to `INPUT_SIZE²` and lays the pixels out as NCHW `[0, 1]` floats.
#[must_use]
pub fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let side = INPUT_SIZE as usize;
    Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
        #[allow(clippy::cast_possible_truncation)]
        let pixel = resized.get_pixel(x as u32, y as u32);
        f32::from(pixel.0.get(c).copied().unwrap_or(0)) / 255.0
    })
}

/// Anchor centres for the 16×16 (2 per cell) and 8×8 (6 per cell) grids.
#[must_use]
pub fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8_usize, 2_usize), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for (stride, per_cell) in strides {
        let grid = INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                #[allow(clippy::cast_precision_loss)]
                let centre = [(x as f32 + 0.5) / grid as f32, (y as f32 + 0.5) / grid as f32];
                anchors.extend(std::iter::repeat_n(centre, per_cell));
            }
        }
    }
    anchors
}

/// Decodes raw model outputs into candidates above `confidence`.
///
/// `regressors` holds `REGRESSOR_STRIDE` values per anchor, `scores` one
/// logit per anchor. Anchors without a complete regressor row are skipped.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn decode(
    regressors: &[f32],
    scores: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Candidate> {
    let input = INPUT_SIZE as f32;
    let fw = frame_width as f32;
    let fh = frame_height as f32;

    scores
        .iter()
        .zip(anchors)
        .zip(regressors.chunks_exact(REGRESSOR_STRIDE))
        .filter_map(|((&logit, anchor), row)| {
            let score = sigmoid(logit);
            if score < confidence {
                return None;
            }
            let [dx, dy, w, h] = match row.get(..4)? {
                &[a, b, c, d] => [a, b, c, d],
                _ => return None,
            };
            let cx = anchor[0] + dx / input;
            let cy = anchor[1] + dy / input;
            let w = w / input;
            let h = h / input;
            Some(Candidate {
                x1: ((cx - w / 2.0) * fw).max(0.0),
                y1: ((cy - h / 2.0) * fh).max(0.0),
                x2: ((cx + w / 2.0) * fw).min(fw),
                y2: ((cy + h / 2.0) * fh).min(fh),
                score,
            })
        })
        .collect()
}

/// Keeps the best box of each overlapping cluster, highest score first.
#[must_use]
pub fn non_max_suppression(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept
            .iter()
            .all(|k| k.iou(&candidate) <= NMS_IOU_THRESHOLD)
        {
            kept.push(candidate);
        }
    }
    kept
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn candidate(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Candidate {
        Candidate {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn preprocess_shape_and_range() {
        let img = RgbImage::from_pixel(50, 30, image::Rgb([255, 255, 255]));
        let tensor = preprocess(&img);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn anchor_count_and_range() {
        let anchors = generate_anchors();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        assert!(
            anchors
                .iter()
                .all(|a| a[0] > 0.0 && a[0] < 1.0 && a[1] > 0.0 && a[1] < 1.0)
        );
    }

    #[test]
    fn sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn decode_filters_low_scores() {
        let anchors = [[0.5, 0.5], [0.25, 0.25]];
        let mut regressors = vec![0.0; REGRESSOR_STRIDE * 2];
        regressors[2] = 64.0;
        regressors[3] = 64.0;
        let scores = [5.0, -5.0];
        let found = decode(&regressors, &scores, &anchors, 0.5, 200, 100);
        assert_eq!(found.len(), 1);
        let c = found[0];
        assert!((c.x1 - 50.0).abs() < 1e-3);
        assert!((c.x2 - 150.0).abs() < 1e-3);
        assert!((c.y1 - 25.0).abs() < 1e-3);
        assert!((c.y2 - 75.0).abs() < 1e-3);
    }

    #[test]
    fn nms_suppresses_overlap_and_sorts() {
        let kept = non_max_suppression(vec![
            candidate(5.0, 5.0, 105.0, 105.0, 0.7),
            candidate(300.0, 300.0, 350.0, 350.0, 0.8),
            candidate(0.0, 0.0, 100.0, 100.0, 0.9),
        ]);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.9).abs() < f32::EPSILON);
        assert!((kept[1].score - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn face_box_is_clamped() {
        let b = candidate(-10.0, 5.0, 500.0, 40.0, 0.9).to_face_box(100, 50);
        assert_eq!(
            b,
            FaceBox {
                x: 0,
                y: 5,
                width: 100,
                height: 35
            }
        );
    }
}
