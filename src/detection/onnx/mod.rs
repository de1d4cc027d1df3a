//! ONNX Runtime backed emotion detector.
//!
//! Two models run per frame: a BlazeFace-style localiser finds faces, then a
//! 7-class classifier scores each grayscale face crop. Each `ort` session
//! needs exclusive access while running, so each sits behind its own mutex;
//! frame decoding and pre/post-processing stay fully concurrent.

pub mod classifier;
pub mod localizer;

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;

use super::{DetectorError, EmotionDetector};
use crate::domain::{DecodedImage, DetectedFace};

/// Face localisation followed by per-face emotion classification.
pub struct OnnxEmotionDetector {
    localizer: Mutex<Session>,
    classifier: Mutex<Session>,
    anchors: Vec<[f32; 2]>,
    confidence: f32,
}

impl fmt::Debug for OnnxEmotionDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxEmotionDetector")
            .field("anchors", &self.anchors.len())
            .field("confidence", &self.confidence)
            .finish_non_exhaustive()
    }
}

impl OnnxEmotionDetector {
    /// Loads both models.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::ModelLoad`] if either file cannot be opened
    /// or is not a valid model.
    pub fn new(
        face_model: &Path,
        emotion_model: &Path,
        confidence: f32,
    ) -> Result<Self, DetectorError> {
        let localizer = load_session(face_model)?;
        let classifier = load_session(emotion_model)?;
        tracing::info!(
            face_model = %face_model.display(),
            emotion_model = %emotion_model.display(),
            confidence,
            "emotion detector loaded"
        );
        Ok(Self {
            localizer: Mutex::new(localizer),
            classifier: Mutex::new(classifier),
            anchors: localizer::generate_anchors(),
            confidence,
        })
    }

    fn locate(&self, image: &DecodedImage) -> Result<Vec<localizer::Candidate>, DetectorError> {
        let input = localizer::preprocess(image.as_rgb());
        let outputs = run(&self.localizer, input, 2)?;
        let mut outputs = outputs.into_iter();
        let (Some(regressors), Some(scores)) = (outputs.next(), outputs.next()) else {
            return Err(DetectorError::InvalidOutput(
                "localiser must produce regressors and scores".to_string(),
            ));
        };
        let candidates = localizer::decode(
            &regressors,
            &scores,
            &self.anchors,
            self.confidence,
            image.width(),
            image.height(),
        );
        Ok(localizer::non_max_suppression(candidates))
    }

    fn classify(
        &self,
        image: &DecodedImage,
        candidate: &localizer::Candidate,
    ) -> Result<DetectedFace, DetectorError> {
        let face = candidate.to_face_box(image.width(), image.height());
        let crop = classifier::padded_box(face, image.width(), image.height());
        let input = classifier::preprocess(image.as_rgb(), crop);
        let outputs = run(&self.classifier, input, 1)?;
        let raw = outputs.into_iter().next().unwrap_or_default();
        let emotions = classifier::scores_from_output(&raw).ok_or_else(|| {
            DetectorError::InvalidOutput(format!(
                "classifier produced {} values, expected 7",
                raw.len()
            ))
        })?;
        Ok(DetectedFace::new(emotions).with_box(face))
    }
}

impl EmotionDetector for OnnxEmotionDetector {
    fn detect_emotions(&self, image: &DecodedImage) -> Result<Vec<DetectedFace>, DetectorError> {
        self.locate(image)?
            .iter()
            .map(|candidate| self.classify(image, candidate))
            .collect()
    }
}

fn load_session(path: &Path) -> Result<Session, DetectorError> {
    let model_load = |message: String| DetectorError::ModelLoad {
        path: path.to_path_buf(),
        message,
    };
    Session::builder()
        .map_err(|e| model_load(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| model_load(e.to_string()))
}

/// Runs one model and copies its first `expected` outputs out of the session.
#[allow(clippy::indexing_slicing)]
fn run(
    session: &Mutex<Session>,
    input: Array4<f32>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, DetectorError> {
    let tensor = ort::value::Tensor::from_array(input)
        .map_err(|e| DetectorError::Inference(e.to_string()))?;
    let mut session = session.lock().map_err(|_| DetectorError::Poisoned)?;
    let outputs = session
        .run(ort::inputs![tensor])
        .map_err(|e| DetectorError::Inference(e.to_string()))?;
    if outputs.len() < expected {
        return Err(DetectorError::InvalidOutput(format!(
            "expected {expected} outputs, got {}",
            outputs.len()
        )));
    }
    (0..expected)
        .map(|i| {
            outputs[i]
                .try_extract_array::<f32>()
                .map(|view| view.iter().copied().collect())
                .map_err(|e| DetectorError::InvalidOutput(e.to_string()))
        })
        .collect()
}
