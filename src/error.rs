//! Per-frame error types and their client-facing messages.
//!
//! [`FrameError`] keeps the internal reason a frame failed (bad base64,
//! missing field, detector failure, ...). Clients see one of three messages,
//! picked by [`FrameErrorKind`]:
//!
//! | Kind         | Message                    |
//! |--------------|----------------------------|
//! | `InvalidJson`| `Invalid JSON format`      |
//! | `Processing` | `Error processing frame`   |
//! | `NoFace`     | `No face detected`         |

use crate::detection::DetectorError;

/// Message sent when the inbound text is not JSON.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON format";

/// Message sent for any decode or inference failure.
pub const PROCESSING_MESSAGE: &str = "Error processing frame";

/// Message sent when the detector finds no face.
pub const NO_FACE_MESSAGE: &str = "No face detected";

/// Why a single frame could not produce a prediction.
///
/// Every variant is recoverable: the session answers with an error message
/// and keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The message text is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required field is absent or has the wrong type.
    #[error("missing or invalid field `{0}`")]
    MissingField(&'static str),

    /// The image string has no comma separating prefix and payload.
    #[error("image is not a data URL (no comma separator)")]
    MalformedDataUrl,

    /// The message was not a text frame.
    #[error("expected a text frame")]
    NotText,

    /// The payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The bytes could not be decoded as an image.
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The detector failed.
    #[error("detector failed: {0}")]
    Detector(#[from] DetectorError),

    /// The detector returned a face with no scores.
    #[error("detector returned an empty emotion map")]
    EmptyScores,

    /// Decoding or inference panicked on the worker thread.
    #[error("frame processing panicked: {0}")]
    Panicked(String),

    /// The detector found no face.
    #[error("no face detected")]
    NoFace,
}

/// External category of a [`FrameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameErrorKind {
    /// The text was not JSON.
    InvalidJson,
    /// Anything that went wrong while decoding or running inference.
    Processing,
    /// The detector found no face.
    NoFace,
}

impl FrameErrorKind {
    /// Returns the fixed client message for this kind.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidJson => INVALID_JSON_MESSAGE,
            Self::Processing => PROCESSING_MESSAGE,
            Self::NoFace => NO_FACE_MESSAGE,
        }
    }
}

impl FrameError {
    /// Returns the external category.
    #[must_use]
    pub const fn kind(&self) -> FrameErrorKind {
        match self {
            Self::InvalidJson(_) => FrameErrorKind::InvalidJson,
            Self::NoFace => FrameErrorKind::NoFace,
            Self::MissingField(_)
            | Self::MalformedDataUrl
            | Self::NotText
            | Self::Base64(_)
            | Self::ImageDecode(_)
            | Self::Detector(_)
            | Self::EmptyScores
            | Self::Panicked(_) => FrameErrorKind::Processing,
        }
    }

    /// Short internal tag for logs.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::MissingField(_) => "missing_field",
            Self::MalformedDataUrl => "malformed_data_url",
            Self::NotText => "not_text",
            Self::Base64(_) => "base64",
            Self::ImageDecode(_) => "image_decode",
            Self::Detector(_) => "detector",
            Self::EmptyScores => "empty_scores",
            Self::Panicked(_) => "panicked",
            Self::NoFace => "no_face",
        }
    }

    /// Returns the message sent to the client.
    ///
    /// With `expose_detail`, processing errors carry the underlying reason
    /// after a colon. The other kinds never change.
    #[must_use]
    pub fn client_message(&self, expose_detail: bool) -> String {
        let kind = self.kind();
        if expose_detail && kind == FrameErrorKind::Processing {
            format!("{}: {self}", kind.message())
        } else {
            kind.message().to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use base64::Engine as _;

    use super::*;

    fn json_error() -> FrameError {
        let Err(e) = serde_json::from_str::<serde_json::Value>("{not json") else {
            panic!("expected a parse error");
        };
        FrameError::from(e)
    }

    #[test]
    fn json_errors_map_to_invalid_json() {
        let err = json_error();
        assert_eq!(err.kind(), FrameErrorKind::InvalidJson);
        assert_eq!(err.client_message(false), "Invalid JSON format");
        assert_eq!(err.client_message(true), "Invalid JSON format");
    }

    #[test]
    fn decode_failures_collapse_to_processing() {
        let Err(b64) = base64::engine::general_purpose::STANDARD.decode("@@@") else {
            panic!("expected a base64 error");
        };
        let errors = [
            FrameError::MissingField("data.image"),
            FrameError::MalformedDataUrl,
            FrameError::NotText,
            FrameError::Base64(b64),
            FrameError::Detector(DetectorError::Poisoned),
            FrameError::EmptyScores,
            FrameError::Panicked("detector blew up".to_string()),
        ];
        for err in &errors {
            assert_eq!(err.kind(), FrameErrorKind::Processing, "{err}");
            assert_eq!(err.client_message(false), "Error processing frame");
        }
    }

    #[test]
    fn detail_is_appended_only_for_processing() {
        let err = FrameError::MissingField("data.image");
        assert_eq!(
            err.client_message(true),
            "Error processing frame: missing or invalid field `data.image`"
        );
        assert_eq!(FrameError::NoFace.client_message(true), "No face detected");
    }

    #[test]
    fn tags_are_distinct() {
        let tags = [
            json_error().tag(),
            FrameError::MissingField("x").tag(),
            FrameError::MalformedDataUrl.tag(),
            FrameError::NotText.tag(),
            FrameError::EmptyScores.tag(),
            FrameError::Panicked(String::new()).tag(),
            FrameError::NoFace.tag(),
        ];
        let unique: std::collections::HashSet<_> = tags.iter().collect();
        assert_eq!(unique.len(), tags.len());
    }
}
