//! Emotion classification stage: grayscale face crop to a 7-way distribution.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

use crate::domain::{Emotion, EmotionScores, FaceBox};

/// Classifier input resolution (square, single channel).
pub const INPUT_SIZE: u32 = 64;

/// Fraction of the box size added on each side before cropping.
const CROP_PADDING: f32 = 0.1;

/// Expands `face` by [`CROP_PADDING`] on every side, clamped to the frame.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn padded_box(face: FaceBox, frame_width: u32, frame_height: u32) -> FaceBox {
    let pad_x = (face.width as f32 * CROP_PADDING) as u32;
    let pad_y = (face.height as f32 * CROP_PADDING) as u32;
    let x = face.x.saturating_sub(pad_x);
    let y = face.y.saturating_sub(pad_y);
    let x2 = face
        .x
        .saturating_add(face.width)
        .saturating_add(pad_x)
        .min(frame_width);
    let y2 = face
        .y
        .saturating_add(face.height)
        .saturating_add(pad_y)
        .min(frame_height);
    FaceBox {
        x,
        y,
        width: x2.saturating_sub(x).max(1),
        height: y2.saturating_sub(y).max(1),
    }
}

/// Crops the face, converts to grayscale, resizes, and lays it out as NHWC
/// floats in `[-1, 1]`.
#[must_use]
pub fn preprocess(image: &RgbImage, face: FaceBox) -> Array4<f32> {
    let crop = imageops::crop_imm(image, face.x, face.y, face.width, face.height).to_image();
    let gray = imageops::grayscale(&crop);
    let resized = imageops::resize(&gray, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let side = INPUT_SIZE as usize;
    Array4::from_shape_fn((1, side, side, 1), |(_, y, x, _)| {
        #[allow(clippy::cast_possible_truncation)]
        let luma = resized.get_pixel(x as u32, y as u32).0;
        let [v] = luma;
        (f32::from(v) / 255.0 - 0.5) * 2.0
    })
}

/// Turns raw classifier output into rounded scores keyed by [`Emotion`].
///
/// Applies softmax unless the output is already a probability
/// distribution. Returns `None` if the output length does not match the
/// label set.
#[must_use]
pub fn scores_from_output(output: &[f32]) -> Option<EmotionScores> {
    if output.len() != Emotion::ALL.len() {
        return None;
    }
    let probabilities = if is_distribution(output) {
        output.to_vec()
    } else {
        softmax(output)
    };
    Some(
        Emotion::ALL
            .iter()
            .zip(probabilities)
            .map(|(emotion, p)| (emotion.as_str(), round2(f64::from(p))))
            .collect(),
    )
}

fn is_distribution(values: &[f32]) -> bool {
    let sum: f32 = values.iter().sum();
    values.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
