//! End-to-end lifecycle tests for the session manager.
//!
//! A fake protocol client records connects and sends, and hands the test
//! the event sender so it can play the transport's part. Time is paused,
//! so reconnect delays elapse instantly but in order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use casper_session::{
    ClientEvent, CredentialStore, Credentials, DisconnectReason, InboundMessage, MessageContent,
    ProtocolClient, ProtocolError, ProtocolResult, SessionConfig, SessionHandle, SessionManager,
    SessionSnapshot, SessionState,
};
use casper_storage::{MemoryCredentialStore, StorageError, StorageResult};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const PEER: &str = "15550001111@s.whatsapp.net";
const PONG: &str = "🏓 Pong! Casper2 online!";

// ── Fakes ────────────────────────────────────────────────────

struct FakeClient {
    events: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    connects_tx: mpsc::UnboundedSender<Option<Credentials>>,
    sent_tx: mpsc::UnboundedSender<(String, String)>,
    fail_next_connect: AtomicBool,
    fail_next_send: AtomicBool,
    hang_on_disconnect: AtomicBool,
    disconnects: AtomicUsize,
}

#[async_trait]
impl ProtocolClient for FakeClient {
    async fn connect(
        &self,
        credentials: Option<Credentials>,
        events: mpsc::Sender<ClientEvent>,
    ) -> ProtocolResult<()> {
        *self.events.lock().unwrap() = Some(events);
        let _ = self.connects_tx.send(credentials);
        if self.fail_next_connect.swap(false, Ordering::SeqCst) {
            return Err(ProtocolError::Transport("bridge unreachable".into()));
        }
        Ok(())
    }

    async fn send(&self, to: &str, text: &str) -> ProtocolResult<()> {
        if self.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(ProtocolError::Timeout(Duration::from_secs(10)));
        }
        let _ = self.sent_tx.send((to.to_owned(), text.to_owned()));
        Ok(())
    }

    async fn disconnect(&self) -> ProtocolResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_disconnect.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Store whose writes always fail.
#[derive(Default)]
struct ReadOnlyStore;

#[async_trait]
impl CredentialStore for ReadOnlyStore {
    async fn load(&self) -> StorageResult<Option<Credentials>> {
        Ok(None)
    }

    async fn save(&self, _credentials: &Credentials) -> StorageResult<()> {
        Err(StorageError::Internal("disk full".into()))
    }

    async fn clear(&self) -> StorageResult<bool> {
        Ok(false)
    }
}

// ── Harness ──────────────────────────────────────────────────

struct Harness {
    client: Arc<FakeClient>,
    connects: mpsc::UnboundedReceiver<Option<Credentials>>,
    sent: mpsc::UnboundedReceiver<(String, String)>,
    handle: SessionHandle,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl Harness {
    fn start(store: Arc<dyn CredentialStore>) -> Self {
        Self::start_with(store, false)
    }

    fn start_with(store: Arc<dyn CredentialStore>, fail_first_connect: bool) -> Self {
        let (connects_tx, connects) = mpsc::unbounded_channel();
        let (sent_tx, sent) = mpsc::unbounded_channel();
        let client = Arc::new(FakeClient {
            events: Mutex::new(None),
            connects_tx,
            sent_tx,
            fail_next_connect: AtomicBool::new(fail_first_connect),
            fail_next_send: AtomicBool::new(false),
            hang_on_disconnect: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
        });

        let manager = SessionManager::new(
            SessionConfig::default(),
            Arc::clone(&client) as Arc<dyn ProtocolClient>,
            store,
        );
        let handle = manager.handle();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(manager.run(shutdown_rx));

        Self {
            client,
            connects,
            sent,
            handle,
            shutdown_tx,
            task,
        }
    }

    async fn next_connect(&mut self) -> Option<Credentials> {
        tokio::time::timeout(Duration::from_secs(30), self.connects.recv())
            .await
            .expect("no connect attempt")
            .expect("client dropped")
    }

    async fn emit(&self, event: ClientEvent) {
        let tx = self
            .client
            .events
            .lock()
            .unwrap()
            .clone()
            .expect("emit before connect");
        tx.send(event).await.unwrap();
    }

    async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Arc<SessionSnapshot> {
        tokio::time::timeout(Duration::from_secs(30), self.handle.wait_until(predicate))
            .await
            .expect("snapshot never matched")
            .expect("manager stopped")
    }

    async fn wait_state(&self, state: SessionState) -> Arc<SessionSnapshot> {
        self.wait_for(|s| s.state == state).await
    }

    async fn next_sent(&mut self) -> (String, String) {
        tokio::time::timeout(Duration::from_secs(30), self.sent.recv())
            .await
            .expect("nothing sent")
            .expect("client dropped")
    }

    /// Connect and go online without pairing.
    async fn online(&mut self) {
        self.next_connect().await;
        self.emit(ClientEvent::ConnectionOpen).await;
        self.wait_state(SessionState::Online).await;
    }

    async fn stop(self) -> Arc<FakeClient> {
        let _ = self.shutdown_tx.send(());
        self.task.await.unwrap();
        self.client
    }
}

fn memory_store() -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::new())
}

fn closed(code: u16) -> ClientEvent {
    ClientEvent::ConnectionClosed { status_code: code }
}

// ── Pairing ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_run_shows_pairing_challenge() {
    let mut h = Harness::start(memory_store());

    let credentials = h.next_connect().await;
    assert!(credentials.is_none());
    let snap = h.wait_state(SessionState::Connecting).await;
    assert!(snap.qr_payload().is_none());

    h.emit(ClientEvent::Qr("2@first".into())).await;
    let snap = h.wait_state(SessionState::AwaitingPairing).await;
    assert_eq!(snap.qr_payload(), Some("2@first"));
    assert!(!snap.is_connected());
    assert!(!snap.credentials_valid);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn connection_open_clears_challenge() {
    let mut h = Harness::start(memory_store());
    h.next_connect().await;
    h.emit(ClientEvent::Qr("2@first".into())).await;
    h.wait_state(SessionState::AwaitingPairing).await;

    h.emit(ClientEvent::ConnectionOpen).await;
    let snap = h.wait_state(SessionState::Online).await;
    assert!(snap.is_connected());
    assert!(snap.qr_payload().is_none());

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn qr_rotation_keeps_only_latest() {
    let mut h = Harness::start(memory_store());
    h.next_connect().await;

    h.emit(ClientEvent::Qr("2@one".into())).await;
    h.emit(ClientEvent::Qr("2@two".into())).await;
    h.emit(ClientEvent::Qr("2@three".into())).await;

    let snap = h.wait_for(|s| s.qr_payload() == Some("2@three")).await;
    assert_eq!(snap.state, SessionState::AwaitingPairing);

    h.stop().await;
}

// ── Credentials ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rotated_credentials_are_persisted_and_reused() {
    let store = memory_store();
    let mut h = Harness::start(Arc::clone(&store) as Arc<dyn CredentialStore>);
    h.next_connect().await;

    let creds = Credentials::new(b"noise-key+signed-identity".to_vec());
    h.emit(ClientEvent::CredentialsUpdated(creds.clone())).await;
    h.emit(ClientEvent::ConnectionOpen).await;
    let snap = h.wait_state(SessionState::Online).await;
    assert!(snap.credentials_valid);
    assert_eq!(store.load().await.unwrap(), Some(creds.clone()));

    // 515 after pairing: reconnect with the saved blob.
    h.emit(closed(515)).await;
    h.wait_state(SessionState::Closed).await;
    assert_eq!(h.next_connect().await, Some(creds));

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_does_not_block_session() {
    let mut h = Harness::start(Arc::new(ReadOnlyStore));
    h.next_connect().await;

    h.emit(ClientEvent::CredentialsUpdated(Credentials::new(vec![1, 2, 3])))
        .await;
    h.emit(ClientEvent::ConnectionOpen).await;
    h.wait_state(SessionState::Online).await;

    h.stop().await;
}

// ── Commands ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn ping_gets_exactly_one_pong() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(ClientEvent::Message(InboundMessage::text(PEER, "!ping")))
        .await;
    let (to, text) = h.next_sent().await;
    assert_eq!(to, PEER);
    assert_eq!(text, PONG);
    assert!(h.sent.try_recv().is_err());

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn unrecognized_text_gets_no_reply() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(ClientEvent::Message(InboundMessage::text(PEER, "hello")))
        .await;
    h.emit(ClientEvent::Message(InboundMessage::text(PEER, "!ping please")))
        .await;
    h.emit(ClientEvent::Message(InboundMessage::text(PEER, "!ping")))
        .await;

    // Events are handled in order, so the first send must be the pong.
    let (_, text) = h.next_sent().await;
    assert_eq!(text, PONG);
    assert!(h.sent.try_recv().is_err());

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn self_messages_never_reach_router() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(ClientEvent::Message(InboundMessage {
        from: PEER.into(),
        from_me: true,
        content: MessageContent::Conversation {
            text: "!ping".into(),
        },
    }))
    .await;
    h.emit(ClientEvent::Message(InboundMessage::text(PEER, "!info")))
        .await;

    let (_, text) = h.next_sent().await;
    assert!(text.starts_with("*Casper2* ✅"), "{text}");
    assert!(h.sent.try_recv().is_err());

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn captions_and_extended_text_are_commands() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(ClientEvent::Message(InboundMessage {
        from: PEER.into(),
        from_me: false,
        content: MessageContent::Image {
            caption: Some(" !PING ".into()),
        },
    }))
    .await;
    assert_eq!(h.next_sent().await.1, PONG);

    h.emit(ClientEvent::Message(InboundMessage {
        from: PEER.into(),
        from_me: false,
        content: MessageContent::Unsupported,
    }))
    .await;
    h.emit(ClientEvent::Message(InboundMessage {
        from: PEER.into(),
        from_me: false,
        content: MessageContent::ExtendedText {
            text: "!ping".into(),
        },
    }))
    .await;
    assert_eq!(h.next_sent().await.1, PONG);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_send_is_dropped_not_retried() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.client.fail_next_send.store(true, Ordering::SeqCst);
    h.emit(ClientEvent::Message(InboundMessage::text(PEER, "!help")))
        .await;
    h.emit(ClientEvent::Message(InboundMessage::text(PEER, "!ping")))
        .await;

    assert_eq!(h.next_sent().await.1, PONG);
    assert!(h.sent.try_recv().is_err());

    h.stop().await;
}

// ── Reconnection ─────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn transient_close_reconnects_after_fixed_delay() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(closed(428)).await;
    let snap = h.wait_state(SessionState::Closed).await;
    assert_eq!(snap.reconnect_attempts, 1);
    assert_eq!(snap.last_disconnect, Some(DisconnectReason::ConnectionClosed));

    let early = tokio::time::timeout(Duration::from_millis(2_900), h.connects.recv()).await;
    assert!(early.is_err(), "reconnected before the delay");

    h.next_connect().await;
    h.wait_state(SessionState::Connecting).await;

    h.emit(ClientEvent::ConnectionOpen).await;
    let snap = h.wait_state(SessionState::Online).await;
    assert_eq!(snap.reconnect_attempts, 0);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn only_one_reconnect_pending_at_a_time() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(closed(408)).await;
    h.emit(closed(500)).await;
    h.emit(closed(503)).await;
    h.wait_state(SessionState::Closed).await;

    h.next_connect().await;
    let extra = tokio::time::timeout(Duration::from_secs(60), h.connects.recv()).await;
    assert!(extra.is_err(), "more than one reconnect fired");

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn close_while_pairing_reconnects() {
    let mut h = Harness::start(memory_store());
    h.next_connect().await;
    h.emit(ClientEvent::Qr("2@pending".into())).await;
    h.wait_state(SessionState::AwaitingPairing).await;

    h.emit(closed(408)).await;
    let snap = h.wait_state(SessionState::Closed).await;
    assert!(snap.qr_payload().is_none());

    h.next_connect().await;
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_connect_is_retried() {
    let mut h = Harness::start_with(memory_store(), true);

    h.next_connect().await;
    let snap = h.wait_state(SessionState::Closed).await;
    assert_eq!(snap.last_disconnect, Some(DisconnectReason::ConnectionLost));
    assert_eq!(snap.reconnect_attempts, 1);

    h.next_connect().await;
    h.wait_state(SessionState::Connecting).await;

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn consecutive_failures_count_up() {
    let mut h = Harness::start(memory_store());
    h.next_connect().await;

    for attempt in 1..=3u32 {
        h.emit(closed(503)).await;
        h.wait_for(|s| s.state == SessionState::Closed && s.reconnect_attempts == attempt)
            .await;
        h.next_connect().await;
        h.wait_state(SessionState::Connecting).await;
    }

    h.stop().await;
}

// ── Logout ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn logged_out_is_terminal() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(closed(401)).await;
    let snap = h.wait_state(SessionState::FatalLoggedOut).await;
    assert!(!snap.credentials_valid);
    assert!(snap.qr_payload().is_none());
    assert_eq!(snap.last_disconnect, Some(DisconnectReason::LoggedOut));

    let retry = tokio::time::timeout(Duration::from_secs(60), h.connects.recv()).await;
    assert!(retry.is_err(), "reconnected after logout");

    // Nothing moves it afterwards.
    h.emit(ClientEvent::ConnectionOpen).await;
    h.emit(ClientEvent::Qr("2@late".into())).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.handle.snapshot().state, SessionState::FatalLoggedOut);

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn logged_out_while_reconnecting_is_fatal() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    h.emit(closed(428)).await;
    h.wait_state(SessionState::Closed).await;
    h.next_connect().await;
    h.emit(closed(401)).await;
    h.wait_state(SessionState::FatalLoggedOut).await;

    let retry = tokio::time::timeout(Duration::from_secs(60), h.connects.recv()).await;
    assert!(retry.is_err());

    h.stop().await;
}

// ── Shutdown ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn shutdown_closes_active_session() {
    let mut h = Harness::start(memory_store());
    h.online().await;

    let client = h.stop().await;
    assert_eq!(client.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_handshake_bounded_by_grace() {
    let mut h = Harness::start(memory_store());
    h.online().await;
    h.client.hang_on_disconnect.store(true, Ordering::SeqCst);

    let grace = SessionConfig::default().shutdown_grace;
    let started = tokio::time::Instant::now();
    let _ = h.shutdown_tx.send(());
    tokio::time::timeout(grace + Duration::from_secs(1), h.task)
        .await
        .expect("manager outlived the shutdown grace")
        .unwrap();

    assert!(started.elapsed() >= grace);
    assert_eq!(h.client.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_closed_cancels_timer() {
    let mut h = Harness::start(memory_store());
    h.online().await;
    h.emit(closed(428)).await;
    h.wait_state(SessionState::Closed).await;

    let Harness {
        client,
        mut connects,
        shutdown_tx,
        task,
        ..
    } = h;
    let _ = shutdown_tx.send(());
    task.await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(client.disconnects.load(Ordering::SeqCst), 0);
    assert!(connects.try_recv().is_err());
}
