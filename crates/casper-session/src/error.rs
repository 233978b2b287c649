//! Errors at the protocol client boundary.

use std::time::Duration;

/// Errors reported by a [`ProtocolClient`](crate::ProtocolClient).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// No live connection to send on.
    #[error("not connected")]
    NotConnected,

    /// The transport refused or failed an outbound message.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The peer did not answer in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connecting or reading from the transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for protocol client operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
