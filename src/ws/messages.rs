//! WebSocket message types: inbound frame submission and outbound result.

use serde::{Deserialize, Serialize};

use crate::domain::EmotionScores;

/// Inbound frame: `{"data": {"image": "<prefix>,<base64>"}}`.
///
/// Deserialized from an already parsed JSON value, so a wrong shape is a
/// processing error rather than a JSON error. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Frame payload.
    pub data: FrameData,
}

/// Body of an [`InboundMessage`].
#[derive(Debug, Clone, Deserialize)]
pub struct FrameData {
    /// Data-URL style string, e.g. `data:image/jpeg;base64,/9j/...`.
    pub image: String,
}

/// Response to one frame. Exactly one shape per response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// `{"predictions": {...}, "emotion": "<label>"}`.
    Prediction {
        /// Scores of the first detected face, unchanged.
        predictions: EmotionScores,
        /// Label with the highest score.
        emotion: String,
    },
    /// `{"error": "<reason>"}`.
    Error {
        /// Human-readable reason.
        error: String,
    },
}

impl OutboundMessage {
    /// Builds an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Serializes to JSON text.
    ///
    /// Serialization of these shapes cannot fail in practice; if it ever
    /// does, the generic processing error is sent instead so the client
    /// still gets one well-formed object.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize response");
            format!(r#"{{"error":"{}"}}"#, crate::error::PROCESSING_MESSAGE)
        })
    }
}
