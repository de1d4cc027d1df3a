//! emotion-relay server entry point.
//!
//! Starts the Axum HTTP server with the health and WebSocket endpoints.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use emotion_relay::app_state::AppState;
use emotion_relay::config::{LogFormat, RelayConfig};
use emotion_relay::detection::EmotionDetector;
use emotion_relay::server;
use emotion_relay::service::FrameProcessor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting emotion-relay");

    // Build the shared detector once; every session reuses it
    let detector = load_detector(&config)?;
    let processor = FrameProcessor::new(detector).with_error_detail(config.expose_error_detail);

    let app_state = AppState {
        processor,
        max_message_bytes: config.max_message_bytes,
    };
    let app = server::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "onnx")]
fn load_detector(
    config: &RelayConfig,
) -> Result<Arc<dyn EmotionDetector>, Box<dyn std::error::Error>> {
    let detector = emotion_relay::detection::OnnxEmotionDetector::new(
        &config.face_model_path,
        &config.emotion_model_path,
        config.face_confidence,
    )?;
    Ok(Arc::new(detector))
}

#[cfg(not(feature = "onnx"))]
fn load_detector(
    _config: &RelayConfig,
) -> Result<Arc<dyn EmotionDetector>, Box<dyn std::error::Error>> {
    Err("no emotion detector available: rebuild with `--features onnx`".into())
}
