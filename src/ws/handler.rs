//! Axum WebSocket upgrade handler.

use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use tracing::Instrument;

use super::session::{Session, run_session};
use crate::app_state::AppState;

/// `GET /ws`: upgrades the HTTP connection to a WebSocket session.
///
/// The session stays in `Connecting` until the upgrade completes. A failed
/// upgrade moves it straight to `Closed` and is logged; nothing is retried.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let session = Session::new(addr.to_string());
    let span = tracing::info_span!(
        "session",
        session_id = %session.id(),
        client = %session.client(),
    );
    let failed_span = span.clone();
    let mut rejected = session.clone();
    let processor = state.processor.clone();

    ws.max_message_size(state.max_message_bytes)
        .on_failed_upgrade(move |error| {
            let _entered = failed_span.enter();
            rejected.fail_accept(&error);
        })
        .on_upgrade(move |socket| run_session(socket, processor, session).instrument(span))
}
