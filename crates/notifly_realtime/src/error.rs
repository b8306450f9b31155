//! Errors raised inside the channel's connection task.
//!
//! None of these cross the public surface of [`crate::ChannelClient`]; they
//! are logged and folded into [`crate::ConnectionState`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RealtimeError {
    /// The endpoint URL could not be built
    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    /// The polling transport failed at the HTTP layer
    #[error("xhr poll error: {0}")]
    Poll(String),

    /// The polling endpoint answered with a non-success status
    #[error("xhr poll error: HTTP {status}")]
    PollStatus { status: u16 },

    /// The websocket transport failed
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// A packet could not be decoded
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The handshake did not complete
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server refused the namespace connection (bad or expired token)
    #[error("server rejected connection: {0}")]
    ServerRejected(String),

    /// The transport closed underneath us
    #[error("transport closed")]
    Closed,
}

impl RealtimeError {
    /// True for failures that mean the realtime endpoint is not mounted on
    /// the server at all (a 404 or a failing poll), as opposed to a
    /// refusal of this particular session.
    pub fn is_endpoint_missing(&self) -> bool {
        matches!(self, RealtimeError::PollStatus { status: 404 } | RealtimeError::Poll(_))
    }
}

impl From<reqwest::Error> for RealtimeError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => RealtimeError::PollStatus {
                status: status.as_u16(),
            },
            None => RealtimeError::Poll(err.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => RealtimeError::Closed,
            other => RealtimeError::WebSocket(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RealtimeError {
    fn from(err: serde_json::Error) -> Self {
        RealtimeError::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RealtimeError>;
