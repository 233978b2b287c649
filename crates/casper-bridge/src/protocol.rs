//! Bridge wire format.
//!
//! Every `WebSocket` text frame carries one JSON object tagged by `type`.
//! Credentials travel as standard base64 so the blob survives JSON.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use casper_session::{ClientEvent, Credentials, InboundMessage, MessageContent};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Close code reported when the link drops without a `close` frame.
pub const IMPLICIT_CLOSE_CODE: u16 = casper_session::state::close_code::CONNECTION_CLOSED;

// ── Outbound ─────────────────────────────────────────────────

/// Frames sent to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Open the messaging session. `None` starts pairing.
    Connect {
        /// Base64 credentials blob.
        credentials: Option<String>,
    },
    /// Send a text message. Answered by a matching `send_ack`.
    Send {
        /// Correlation id.
        id: u64,
        /// Destination.
        to: String,
        /// Body.
        text: String,
    },
    /// Close the messaging session without logging out.
    Disconnect,
}

impl ClientFrame {
    /// Build a `connect` frame.
    #[must_use]
    pub fn connect(credentials: Option<&Credentials>) -> Self {
        Self::Connect {
            credentials: credentials.map(encode_credentials),
        }
    }
}

// ── Inbound ──────────────────────────────────────────────────

/// Frames received from the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeFrame {
    /// New pairing QR payload.
    Qr {
        /// QR payload.
        payload: String,
    },
    /// Session authenticated.
    Open,
    /// Session closed.
    Close {
        /// Protocol status code.
        status_code: u16,
    },
    /// Credentials rotated.
    Creds {
        /// Base64 credentials blob.
        credentials: String,
    },
    /// Inbound message.
    Message {
        /// Sender.
        from: String,
        /// Sent by this account.
        #[serde(default)]
        from_me: bool,
        /// Payload.
        content: MessageContent,
    },
    /// Result of a `send`.
    SendAck {
        /// Correlation id from the `send` frame.
        id: u64,
        /// Failure reason, absent on success.
        #[serde(default)]
        error: Option<String>,
    },
}

/// What the reader does with one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Forward to the session manager.
    Event(ClientEvent),
    /// Resolve a pending send.
    Ack {
        /// Correlation id.
        id: u64,
        /// `Err` with the bridge's reason on failure.
        result: Result<(), String>,
    },
}

impl BridgeFrame {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Json`] for malformed or unknown frames.
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Translate into an event or an acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Encoding`] if a `creds` frame is not base64.
    pub fn into_inbound(self) -> Result<Inbound, BridgeError> {
        let event = match self {
            Self::Qr { payload } => ClientEvent::Qr(payload),
            Self::Open => ClientEvent::ConnectionOpen,
            Self::Close { status_code } => ClientEvent::ConnectionClosed { status_code },
            Self::Creds { credentials } => {
                ClientEvent::CredentialsUpdated(decode_credentials(&credentials)?)
            },
            Self::Message {
                from,
                from_me,
                content,
            } => ClientEvent::Message(InboundMessage {
                from,
                from_me,
                content,
            }),
            Self::SendAck { id, error } => {
                return Ok(Inbound::Ack {
                    id,
                    result: error.map_or(Ok(()), Err),
                });
            },
        };
        Ok(Inbound::Event(event))
    }
}

// ── Credentials encoding ─────────────────────────────────────

/// Base64-encode a credentials blob for the wire.
#[must_use]
pub fn encode_credentials(credentials: &Credentials) -> String {
    STANDARD.encode(credentials.as_bytes())
}

/// Decode a wire credentials field.
///
/// # Errors
///
/// Returns [`BridgeError::Encoding`] on invalid base64.
pub fn decode_credentials(encoded: &str) -> Result<Credentials, BridgeError> {
    Ok(Credentials::new(STANDARD.decode(encoded.trim())?))
}
