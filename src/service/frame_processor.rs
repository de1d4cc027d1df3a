//! Frame processor: one inbound text message in, one response out.

use std::sync::Arc;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;
use serde_json::Value;

use crate::detection::EmotionDetector;
use crate::domain::DecodedImage;
use crate::error::{FrameError, FrameErrorKind};
use crate::ws::messages::{InboundMessage, OutboundMessage};

/// Standard alphabet; trailing `=` padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes frames and shapes detector output into responses.
///
/// Cheap to clone: the detector is shared behind an [`Arc`]. Processing is
/// synchronous and CPU bound; async callers should run it on a blocking
/// thread.
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    detector: Arc<dyn EmotionDetector>,
    expose_error_detail: bool,
}

impl FrameProcessor {
    /// Creates a processor around a shared detector.
    #[must_use]
    pub fn new(detector: Arc<dyn EmotionDetector>) -> Self {
        Self {
            detector,
            expose_error_detail: false,
        }
    }

    /// Appends the underlying reason to processing error messages.
    #[must_use]
    pub fn with_error_detail(mut self, expose: bool) -> Self {
        self.expose_error_detail = expose;
        self
    }

    /// Processes one raw message. Never fails: errors become error responses.
    #[must_use]
    pub fn process(&self, raw: &str) -> OutboundMessage {
        self.try_process(raw).unwrap_or_else(|err| self.reject(&err))
    }

    /// Processes one raw message, keeping the internal error.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] describing the first step that failed.
    pub fn try_process(&self, raw: &str) -> Result<OutboundMessage, FrameError> {
        let image = decode_frame(raw)?;
        let mut faces = self.detector.detect_emotions(&image)?.into_iter();
        let face = faces.next().ok_or(FrameError::NoFace)?;

        let discarded = faces.len();
        if discarded > 0 {
            tracing::debug!(discarded, "multiple faces detected; using the first");
        }

        let emotion = face
            .emotions
            .dominant()
            .ok_or(FrameError::EmptyScores)?
            .to_string();
        Ok(OutboundMessage::Prediction {
            predictions: face.emotions,
            emotion,
        })
    }

    /// Logs `err` under its category and builds the error response.
    #[must_use]
    pub fn reject(&self, err: &FrameError) -> OutboundMessage {
        match err.kind() {
            FrameErrorKind::InvalidJson => {
                tracing::warn!(error = %err, "JSON decode error");
            }
            FrameErrorKind::NoFace => {
                tracing::warn!("no face detected in image");
            }
            FrameErrorKind::Processing => {
                tracing::error!(kind = err.tag(), error = %err, "error processing frame");
            }
        }
        OutboundMessage::error(err.client_message(self.expose_error_detail))
    }
}

/// Parses the message and decodes its image.
///
/// # Errors
///
/// [`FrameError::InvalidJson`] if `raw` is not JSON; a processing-kind
/// [`FrameError`] for anything wrong after that.
pub fn decode_frame(raw: &str) -> Result<DecodedImage, FrameError> {
    let message: Value = serde_json::from_str(raw)?;
    let frame = extract_image(&message)?;
    let bytes = decode_payload(split_payload(&frame.data.image)?)?;
    Ok(DecodedImage::decode(&bytes)?)
}

/// Reads the parsed message as an [`InboundMessage`].
///
/// # Errors
///
/// [`FrameError::MissingField`] if `data` or `data.image` is absent or not
/// the expected type.
pub fn extract_image(message: &Value) -> Result<InboundMessage, FrameError> {
    InboundMessage::deserialize(message).map_err(|e| {
        tracing::debug!(error = %e, "inbound message has the wrong shape");
        FrameError::MissingField("data.image")
    })
}

/// Returns everything after the first comma, unchanged. The prefix is not
/// checked.
///
/// # Errors
///
/// [`FrameError::MalformedDataUrl`] if there is no comma.
pub fn split_payload(image: &str) -> Result<&str, FrameError> {
    image
        .split_once(',')
        .map(|(_, payload)| payload)
        .ok_or(FrameError::MalformedDataUrl)
}

/// Decodes a standard-alphabet base64 payload.
///
/// # Errors
///
/// [`FrameError::Base64`] on invalid characters or length.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, FrameError> {
    Ok(PAYLOAD_ENGINE.decode(payload)?)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use base64::engine::general_purpose::STANDARD;
    use image::{ImageFormat, RgbImage};

    use super::*;
    use crate::detection::DetectorError;
    use crate::domain::{DetectedFace, EmotionScores};

    #[derive(Debug, Default)]
    struct StubDetector {
        faces: Vec<DetectedFace>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubDetector {
        fn returning(faces: Vec<DetectedFace>) -> Arc<Self> {
            Arc::new(Self {
                faces,
                ..Self::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Self::default()
            })
        }
    }

    impl EmotionDetector for StubDetector {
        fn detect_emotions(
            &self,
            _image: &DecodedImage,
        ) -> Result<Vec<DetectedFace>, DetectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DetectorError::Inference("model crashed".to_string()));
            }
            Ok(self.faces.clone())
        }
    }

    fn face(scores: &[(&str, f64)]) -> DetectedFace {
        DetectedFace::new(scores.iter().copied().collect::<EmotionScores>())
    }

    fn black_pixel_jpeg_b64() -> String {
        let mut buf = Cursor::new(Vec::new());
        let Ok(()) = RgbImage::new(1, 1).write_to(&mut buf, ImageFormat::Jpeg) else {
            panic!("jpeg encoding failed");
        };
        STANDARD.encode(buf.into_inner())
    }

    fn frame_message() -> String {
        format!(
            r#"{{"data":{{"image":"data:image/jpeg;base64,{}"}}}}"#,
            black_pixel_jpeg_b64()
        )
    }

    fn processor(detector: Arc<StubDetector>) -> FrameProcessor {
        FrameProcessor::new(detector)
    }

    #[test]
    fn invalid_json_is_reported_without_calling_detector() {
        let detector = StubDetector::returning(vec![]);
        let proc = processor(Arc::clone(&detector));
        for raw in ["", "{", "not json", r#"{"data": }"#] {
            assert_eq!(
                proc.process(raw),
                OutboundMessage::error("Invalid JSON format"),
                "input {raw:?}"
            );
        }
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wrong_shapes_are_processing_errors() {
        let proc = processor(StubDetector::returning(vec![]));
        let inputs = [
            "[]",
            "42",
            r#"{"image":"a,b"}"#,
            r#"{"data":{}}"#,
            r#"{"data":{"image":5}}"#,
            r#"{"data":"a,b"}"#,
            r#"{"data":{"image":"no comma here"}}"#,
            r#"{"data":{"image":"data:image/jpeg;base64,@@not-base64@@"}}"#,
            r#"{"data":{"image":"data:image/jpeg;base64,aGVsbG8gd29ybGQ="}}"#,
        ];
        for raw in inputs {
            assert_eq!(
                proc.process(raw),
                OutboundMessage::error("Error processing frame"),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn step_errors_are_tagged() {
        let proc = processor(StubDetector::returning(vec![]));
        let cases = [
            (r#"{"data":{}}"#, "missing_field"),
            (r#"{"data":{"image":"abc"}}"#, "malformed_data_url"),
            (r#"{"data":{"image":"x,!!!"}}"#, "base64"),
            (r#"{"data":{"image":"x,aGVsbG8="}}"#, "image_decode"),
        ];
        for (raw, tag) in cases {
            let Err(err) = proc.try_process(raw) else {
                panic!("expected failure for {raw}");
            };
            assert_eq!(err.tag(), tag, "input {raw}");
        }
    }

    #[test]
    fn no_face_detected() {
        let proc = processor(StubDetector::returning(vec![]));
        assert_eq!(
            proc.process(&frame_message()),
            OutboundMessage::error("No face detected")
        );
    }

    #[test]
    fn first_face_predictions_are_returned_unchanged() {
        let proc = processor(StubDetector::returning(vec![face(&[
            ("happy", 0.9),
            ("sad", 0.1),
        ])]));
        let response = proc.process(&frame_message());
        assert_eq!(
            response.to_json(),
            r#"{"predictions":{"happy":0.9,"sad":0.1},"emotion":"happy"}"#
        );
    }

    #[test]
    fn later_faces_are_ignored() {
        let proc = processor(StubDetector::returning(vec![
            face(&[("angry", 0.6), ("happy", 0.4)]),
            face(&[("angry", 0.0), ("happy", 1.0)]),
        ]));
        let OutboundMessage::Prediction { emotion, .. } = proc.process(&frame_message()) else {
            panic!("expected a prediction");
        };
        assert_eq!(emotion, "angry");
    }

    #[test]
    fn ties_resolve_to_first_label() {
        let proc = processor(StubDetector::returning(vec![face(&[
            ("neutral", 0.5),
            ("happy", 0.5),
        ])]));
        let OutboundMessage::Prediction { emotion, .. } = proc.process(&frame_message()) else {
            panic!("expected a prediction");
        };
        assert_eq!(emotion, "neutral");
    }

    #[test]
    fn detector_failure_and_empty_scores_are_processing_errors() {
        let failing = processor(StubDetector::failing());
        assert_eq!(
            failing.process(&frame_message()),
            OutboundMessage::error("Error processing frame")
        );

        let empty = processor(StubDetector::returning(vec![face(&[])]));
        assert_eq!(
            empty.process(&frame_message()),
            OutboundMessage::error("Error processing frame")
        );
    }

    #[test]
    fn detail_is_exposed_when_enabled() {
        let proc = processor(StubDetector::failing()).with_error_detail(true);
        assert_eq!(
            proc.process(&frame_message()),
            OutboundMessage::error(
                "Error processing frame: detector failed: inference failed: model crashed"
            )
        );
    }

    #[test]
    fn payload_is_everything_after_first_comma() {
        assert_eq!(split_payload("a,b,c").ok(), Some("b,c"));
        assert_eq!(split_payload(",xyz").ok(), Some("xyz"));
        assert!(split_payload("xyz").is_err());
    }

    #[test]
    fn payload_whitespace_is_not_stripped() {
        assert_eq!(split_payload("data:x, aGk=\n").ok(), Some(" aGk=\n"));
        let proc = processor(StubDetector::returning(vec![]));
        let raw = format!(
            r#"{{"data":{{"image":"data:image/jpeg;base64,{} "}}}}"#,
            black_pixel_jpeg_b64()
        );
        let Err(err) = proc.try_process(&raw) else {
            panic!("trailing space should fail base64 decoding");
        };
        assert_eq!(err.tag(), "base64");
    }

    #[test]
    fn padding_is_optional() {
        assert_eq!(decode_payload("aGk=").ok(), Some(b"hi".to_vec()));
        assert_eq!(decode_payload("aGk").ok(), Some(b"hi".to_vec()));
    }
}
