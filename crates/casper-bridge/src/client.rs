//! [`ProtocolClient`] implementation over the bridge socket.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use casper_session::{ClientEvent, Credentials, ProtocolClient, ProtocolError, ProtocolResult};
use futures::StreamExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use crate::connection::{self, WsReader};
use crate::protocol::{BridgeFrame, ClientFrame, IMPLICIT_CLOSE_CODE, Inbound};

/// Outbound frames queued at once.
const OUTBOUND_CAPACITY: usize = 64;

/// How long the writer gets to flush after the outbound channel closes.
const WRITER_FLUSH: Duration = Duration::from_secs(2);

/// Sends awaiting a `send_ack` on one link.
///
/// Closed by the reader when the link ends, after which no new waiter is
/// accepted.
#[derive(Default)]
struct Acks {
    closed: bool,
    waiters: HashMap<u64, oneshot::Sender<Result<(), String>>>,
}

type PendingAcks = Arc<Mutex<Acks>>;

// ── Configuration ────────────────────────────────────────────

/// Bridge client settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// `ws://` or `wss://` URL of the bridge.
    pub url: String,
    /// How long a send waits for its `send_ack`.
    pub send_timeout: Duration,
    /// How long the socket handshake may take.
    pub connect_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8085".to_string(),
            send_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// ── Client ───────────────────────────────────────────────────

/// One socket plus its two tasks and its pending sends.
struct Link {
    outbound_tx: mpsc::Sender<ClientFrame>,
    pending: PendingAcks,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl Link {
    /// Stop reading, then let the writer send its close frame.
    ///
    /// The reader goes first so a closing link cannot report a late
    /// `ConnectionClosed` against its successor.
    async fn close(self) {
        self.reader.abort();
        drop(self.outbound_tx);
        let mut writer = self.writer;
        tokio::select! {
            _ = &mut writer => {},
            () = tokio::time::sleep(WRITER_FLUSH) => {
                writer.abort();
            },
        }
        let mut acks = self.pending.lock().await;
        acks.closed = true;
        acks.waiters.clear();
    }
}

/// Protocol client that talks JSON frames to an external bridge process.
pub struct BridgeClient {
    config: BridgeConfig,
    link: Mutex<Option<Link>>,
    next_id: AtomicU64,
}

impl BridgeClient {
    /// Create a client. Nothing connects until
    /// [`ProtocolClient::connect`].
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            link: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    async fn outbound(&self) -> ProtocolResult<(mpsc::Sender<ClientFrame>, PendingAcks)> {
        self.link
            .lock()
            .await
            .as_ref()
            .map(|link| (link.outbound_tx.clone(), Arc::clone(&link.pending)))
            .ok_or(ProtocolError::NotConnected)
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProtocolClient for BridgeClient {
    async fn connect(
        &self,
        credentials: Option<Credentials>,
        events: mpsc::Sender<ClientEvent>,
    ) -> ProtocolResult<()> {
        let mut link = self.link.lock().await;
        if let Some(stale) = link.take() {
            debug!("Closing previous bridge link");
            stale.close().await;
        }

        info!(url = %self.config.url, "Connecting to bridge");
        let (ws_writer, ws_reader) =
            connection::connect(&self.config.url, self.config.connect_timeout).await?;

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        outbound_tx
            .send(ClientFrame::connect(credentials.as_ref()))
            .await
            .map_err(|_| ProtocolError::Transport("writer channel closed".into()))?;

        let pending = PendingAcks::default();
        let writer = connection::spawn_writer(ws_writer, outbound_rx);
        let reader = tokio::spawn(run_reader(ws_reader, events, Arc::clone(&pending)));

        *link = Some(Link {
            outbound_tx,
            pending,
            writer,
            reader,
        });
        Ok(())
    }

    async fn send(&self, to: &str, text: &str) -> ProtocolResult<()> {
        let (outbound_tx, pending) = self.outbound().await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (ack_tx, ack_rx) = oneshot::channel();
        {
            let mut acks = pending.lock().await;
            if acks.closed {
                return Err(ProtocolError::NotConnected);
            }
            acks.waiters.insert(id, ack_tx);
        }

        let frame = ClientFrame::Send {
            id,
            to: to.to_owned(),
            text: text.to_owned(),
        };
        if outbound_tx.send(frame).await.is_err() {
            pending.lock().await.waiters.remove(&id);
            return Err(ProtocolError::NotConnected);
        }

        match tokio::time::timeout(self.config.send_timeout, ack_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(ProtocolError::SendFailed(reason)),
            Ok(Err(_)) => Err(ProtocolError::NotConnected),
            Err(_) => {
                pending.lock().await.waiters.remove(&id);
                Err(ProtocolError::Timeout(self.config.send_timeout))
            },
        }
    }

    async fn disconnect(&self) -> ProtocolResult<()> {
        let Some(link) = self.link.lock().await.take() else {
            return Ok(());
        };

        let _ = link.outbound_tx.send(ClientFrame::Disconnect).await;
        link.close().await;
        info!("Bridge link closed");
        Ok(())
    }
}

// ── Reader ───────────────────────────────────────────────────

/// Read frames until the link ends, forwarding events in arrival order.
///
/// Exactly one `ConnectionClosed` is reported per link: the bridge's own
/// `close` frame if it sent one, otherwise an implicit one when the socket
/// drops.
async fn run_reader(
    mut ws_reader: WsReader,
    events: mpsc::Sender<ClientEvent>,
    pending: PendingAcks,
) {
    let mut close_reported = false;

    while let Some(msg) = ws_reader.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Bridge sent close frame");
                break;
            },
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Bridge read error");
                break;
            },
        };

        let inbound = match BridgeFrame::parse(&text).and_then(BridgeFrame::into_inbound) {
            Ok(inbound) => inbound,
            Err(e) => {
                trace!(error = %e, "Dropping malformed bridge frame");
                continue;
            },
        };

        match inbound {
            Inbound::Ack { id, result } => {
                if let Some(ack_tx) = pending.lock().await.waiters.remove(&id) {
                    let _ = ack_tx.send(result);
                } else {
                    trace!(id, "Ack for unknown send");
                }
            },
            Inbound::Event(event) => {
                let is_close = matches!(event, ClientEvent::ConnectionClosed { .. });
                if is_close {
                    pending.lock().await.closed = true;
                }
                if events.send(event).await.is_err() {
                    debug!("Session manager gone; stopping reader");
                    close_reported = true;
                    break;
                }
                if is_close {
                    close_reported = true;
                    break;
                }
            },
        }
    }

    // Sends still waiting on this link will never be acknowledged, and no
    // new one may start. Closed before the implicit event goes out so a
    // caller reacting to it sees `NotConnected`.
    {
        let mut acks = pending.lock().await;
        acks.closed = true;
        acks.waiters.clear();
    }

    if !close_reported {
        let _ = events
            .send(ClientEvent::ConnectionClosed {
                status_code: IMPLICIT_CLOSE_CODE,
            })
            .await;
    }
}
