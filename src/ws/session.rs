//! WebSocket session: state machine and the receive/process/respond loop.
//!
//! One session owns one connection. The loop reads one message, answers it
//! with exactly one response, and only then reads the next. Per-frame
//! failures (panics included) become error responses. Only the transport
//! going away or a failed send ends the session.

use std::fmt;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use uuid::Uuid;

use crate::error::FrameError;
use crate::service::FrameProcessor;

/// Lifecycle of a session.
///
/// `Connecting → Open → Closing → Closed`, or `Connecting → Closed` when the
/// upgrade fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgrade in progress.
    Connecting,
    /// Exchanging messages.
    Open,
    /// Loop finished; closing the transport.
    Closing,
    /// Transport released.
    Closed,
}

impl SessionState {
    /// Returns `true` if moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Open | Self::Closed)
                | (Self::Open, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Identity and lifecycle state of one client connection.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    client: String,
    state: SessionState,
}

impl Session {
    /// Creates a session in [`SessionState::Connecting`].
    #[must_use]
    pub fn new(client: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client: client.into(),
            state: SessionState::Connecting,
        }
    }

    /// Unique session id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Client address.
    #[must_use]
    pub fn client(&self) -> &str {
        &self.client
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Moves to `next` if the transition is legal. Returns whether it moved.
    #[must_use]
    pub fn transition(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "ignored illegal session transition");
            return false;
        }
        tracing::debug!(from = %self.state, to = %next, "session transition");
        self.state = next;
        true
    }

    /// Records a failed upgrade: logs it and moves `Connecting → Closed`.
    pub fn fail_accept(&mut self, error: &dyn fmt::Display) {
        tracing::warn!(%error, "websocket accept failed; session discarded");
        if !self.transition(SessionState::Closed) {
            tracing::debug!(state = %self.state, "accept failure after the session left connecting");
        }
    }
}

/// Why the message loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection. Not an error.
    PeerClosed,
    /// Receiving failed at the transport level.
    TransportError(String),
    /// A response could not be delivered.
    SendFailed(String),
}

impl SessionEnd {
    /// Returns `true` unless the peer closed normally.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        !matches!(self, Self::PeerClosed)
    }
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed the connection"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
            Self::SendFailed(e) => write!(f, "failed to send response: {e}"),
        }
    }
}

/// Drives one accepted WebSocket until it ends, then closes it.
pub async fn run_session(socket: WebSocket, processor: FrameProcessor, mut session: Session) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    drive_session(&mut ws_rx, &mut ws_tx, &processor, &mut session).await;
}

/// Opens `session`, runs the message loop, logs why it ended, and closes
/// the transport.
///
/// Returns `None` without reading anything if `session` is no longer
/// connecting. The transport is still closed in that case.
pub async fn drive_session<R, W, E>(
    rx: &mut R,
    tx: &mut W,
    processor: &FrameProcessor,
    session: &mut Session,
) -> Option<SessionEnd>
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    if !session.transition(SessionState::Open) {
        tracing::warn!(state = %session.state(), "session cannot open; dropping connection");
        close_transport(tx, session).await;
        return None;
    }
    tracing::info!("websocket connection established");

    let end = message_loop(rx, tx, processor).await;
    if end.is_error() {
        tracing::error!(reason = %end, "websocket session ended with error");
    } else {
        tracing::info!("websocket connection closed");
    }

    close_transport(tx, session).await;
    Some(end)
}

/// Best-effort close. A failing close is logged and swallowed.
async fn close_transport<W>(tx: &mut W, session: &mut Session)
where
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    if !session.transition(SessionState::Closing) {
        tracing::debug!(state = %session.state(), "closing a session that was never open");
    }
    if let Err(error) = tx.close().await {
        tracing::debug!(%error, "close after session end failed");
    }
    if !session.transition(SessionState::Closed) {
        tracing::debug!(state = %session.state(), "session already closed");
    }
}

/// Receive → process → respond until the stream ends or a transport step
/// fails.
///
/// Text frames are processed on a blocking thread and answered with exactly
/// one message, even if processing panics. Binary frames are answered with
/// a processing error. Ping and pong frames are skipped.
pub async fn message_loop<R, W, E>(
    rx: &mut R,
    tx: &mut W,
    processor: &FrameProcessor,
) -> SessionEnd
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
    W: Sink<Message> + Unpin,
    W::Error: fmt::Display,
{
    loop {
        let response = match rx.next().await {
            None | Some(Ok(Message::Close(_))) => return SessionEnd::PeerClosed,
            Some(Err(e)) => return SessionEnd::TransportError(e.to_string()),
            Some(Ok(Message::Text(text))) => {
                let worker = processor.clone();
                match tokio::task::spawn_blocking(move || worker.process(text.as_str())).await {
                    Ok(response) => response,
                    Err(e) => processor.reject(&FrameError::Panicked(e.to_string())),
                }
            }
            Some(Ok(Message::Binary(_))) => processor.reject(&FrameError::NotText),
            Some(Ok(_)) => continue,
        };

        if let Err(e) = tx.send(Message::text(response.to_json())).await {
            return SessionEnd::SendFailed(e.to_string());
        }
    }
}
