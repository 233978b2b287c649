//! `WebSocket` connection to the bridge process.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error};

use crate::error::BridgeError;
use crate::protocol::ClientFrame;

/// Type alias for the `WebSocket` stream to the bridge.
pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read half of the bridge socket.
pub(crate) type WsReader = SplitStream<WsStream>;

/// Write half of the bridge socket.
pub(crate) type WsWriter = SplitSink<WsStream, Message>;

/// Open a socket to `url` within `timeout`, split into halves.
pub(crate) async fn connect(
    url: &str,
    timeout: Duration,
) -> Result<(WsWriter, WsReader), BridgeError> {
    let (ws, _response) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| BridgeError::Protocol(format!("connect to {url} timed out")))??;
    Ok(ws.split())
}

/// Spawn the writer task.
///
/// Serializes frames from `outbound_rx` in order. When the channel closes
/// it sends a normal close frame and exits.
pub(crate) fn spawn_writer(
    mut ws_writer: WsWriter,
    mut outbound_rx: mpsc::Receiver<ClientFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(j) => j,
                Err(e) => {
                    error!(error = %e, "Failed to serialize bridge frame");
                    continue;
                },
            };
            if let Err(e) = ws_writer.send(Message::text(json)).await {
                debug!(error = %e, "Writer task: send failed");
                return;
            }
        }

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "session closed".into(),
        };
        let _ = ws_writer.send(Message::Close(Some(frame))).await;
        let _ = ws_writer.close().await;
    })
}
