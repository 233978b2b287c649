//! Error types for the bridge client.

use casper_session::ProtocolError;

/// Errors produced by the bridge client.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// `WebSocket` transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A credentials field was not valid base64.
    #[error("credentials encoding error: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The link is gone.
    #[error("bridge connection closed")]
    Closed,

    /// The bridge broke the framing contract.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for BridgeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl From<BridgeError> for ProtocolError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Closed => Self::NotConnected,
            BridgeError::WebSocket(e) => Self::Transport(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}
