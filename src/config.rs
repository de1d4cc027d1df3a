//! Relay configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Bind address and model locations are deployment concerns;
//! the session loop itself takes no configuration beyond the error-detail
//! switch.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8000`).
    pub listen_addr: SocketAddr,

    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_bytes: usize,

    /// Append the underlying reason to "Error processing frame" responses.
    pub expose_error_detail: bool,

    /// Log output format.
    pub log_format: LogFormat,

    /// ONNX face localisation model.
    pub face_model_path: PathBuf,

    /// ONNX emotion classification model.
    pub emotion_model_path: PathBuf,

    /// Minimum face detection confidence.
    pub face_confidence: f32,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()?;

        let max_message_bytes = parse_var(&lookup, "MAX_MESSAGE_BYTES", 16 * 1024 * 1024);
        let expose_error_detail = parse_var_bool(&lookup, "EXPOSE_ERROR_DETAIL", false);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let face_model_path = lookup("FACE_MODEL_PATH")
            .map_or_else(|| PathBuf::from("models/face_detection.onnx"), PathBuf::from);
        let emotion_model_path = lookup("EMOTION_MODEL_PATH")
            .map_or_else(|| PathBuf::from("models/emotion.onnx"), PathBuf::from);
        let face_confidence = parse_var(&lookup, "FACE_CONFIDENCE", 0.5_f32);

        Ok(Self {
            listen_addr,
            max_message_bytes,
            expose_error_detail,
            log_format,
            face_model_path,
            emotion_model_path,
            face_confidence,
        })
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses a variable as a boolean. Accepts `"true"`, `"1"`, `"false"`,
/// `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_var_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<RelayConfig, Box<dyn std::error::Error>> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RelayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let Ok(cfg) = load(&[]) else {
            panic!("defaults must load");
        };
        assert_eq!(cfg.listen_addr.port(), 8000);
        assert_eq!(cfg.max_message_bytes, 16 * 1024 * 1024);
        assert!(!cfg.expose_error_detail);
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert_eq!(cfg.face_model_path, PathBuf::from("models/face_detection.onnx"));
        assert!((cfg.face_confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn values_are_read() {
        let Ok(cfg) = load(&[
            ("LISTEN_ADDR", "127.0.0.1:9100"),
            ("MAX_MESSAGE_BYTES", "1024"),
            ("EXPOSE_ERROR_DETAIL", "TRUE"),
            ("LOG_FORMAT", "json"),
            ("EMOTION_MODEL_PATH", "/srv/emotion.onnx"),
            ("FACE_CONFIDENCE", "0.75"),
        ]) else {
            panic!("config must load");
        };
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:9100");
        assert_eq!(cfg.max_message_bytes, 1024);
        assert!(cfg.expose_error_detail);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.emotion_model_path, PathBuf::from("/srv/emotion.onnx"));
        assert!((cfg.face_confidence - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let Ok(cfg) = load(&[("MAX_MESSAGE_BYTES", "lots"), ("EXPOSE_ERROR_DETAIL", "maybe")])
        else {
            panic!("config must load");
        };
        assert_eq!(cfg.max_message_bytes, 16 * 1024 * 1024);
        assert!(!cfg.expose_error_detail);
    }

    #[test]
    fn invalid_listen_addr_is_an_error() {
        assert!(load(&[("LISTEN_ADDR", "not-an-address")]).is_err());
    }
}
