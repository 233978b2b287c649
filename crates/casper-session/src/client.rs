//! The protocol client boundary.
//!
//! The real messaging protocol (handshake, encryption, framing) lives
//! behind [`ProtocolClient`]. The session manager only sees the events it
//! delivers and the few calls below.

use async_trait::async_trait;
use casper_storage::Credentials;
use tokio::sync::mpsc;

use crate::error::ProtocolResult;
use crate::message::InboundMessage;

/// Events a protocol client delivers to the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A new pairing QR payload.
    Qr(String),
    /// Authentication finished; the session is live.
    ConnectionOpen,
    /// The transport closed with this status code.
    ConnectionClosed {
        /// Raw close code.
        status_code: u16,
    },
    /// The credentials rotated and must be persisted.
    CredentialsUpdated(Credentials),
    /// A message arrived.
    Message(InboundMessage),
}

/// A live messaging-protocol connection.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Open a connection. `credentials` is `None` on first run, which makes
    /// the client start a pairing flow. Every event for this connection is
    /// sent on `events`.
    ///
    /// Returns once the transport is up. Authentication completes later
    /// and is reported as [`ClientEvent::ConnectionOpen`].
    async fn connect(
        &self,
        credentials: Option<Credentials>,
        events: mpsc::Sender<ClientEvent>,
    ) -> ProtocolResult<()>;

    /// Send a text message. Returns once the peer acknowledged it.
    async fn send(&self, to: &str, text: &str) -> ProtocolResult<()>;

    /// Close the session cleanly. The stored credentials stay valid.
    async fn disconnect(&self) -> ProtocolResult<()>;
}
