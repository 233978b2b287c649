//! Session lifecycle manager.
//!
//! Drives the [`ProtocolClient`] through the state machine in
//! [`crate::machine`]. Client events, reconnect ticks and the shutdown
//! signal are consumed by a single task, one at a time, and every handler
//! (including an awaited reply send) completes before the next event is
//! taken.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ─start─► Connecting ─qr─► AwaitingPairing ─open─► Online
//!                   ▲                                       │
//!                   └──── delay ◄── Closed ◄── close(!401) ─┘
//!                                               close(401) ─► FatalLoggedOut
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use casper_storage::{CredentialStore, Credentials};
use chrono::{DateTime, FixedOffset, Local};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, trace, warn};

use crate::client::{ClientEvent, ProtocolClient};
use crate::context::SessionContext;
use crate::machine::{self, Effect, SessionEvent};
use crate::message::InboundMessage;
use crate::router::{CommandContext, Router};
use crate::snapshot::{SessionHandle, SessionSnapshot};
use crate::state::{DisconnectReason, PairingChallenge, SessionState};

/// Reconnect ticks in flight at once. Only one timer is ever armed.
const DUE_CHANNEL_CAPACITY: usize = 4;

// ── Configuration ────────────────────────────────────────────

/// Settings for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed delay before reconnecting after a non-fatal close.
    pub reconnect_delay: Duration,
    /// Upper bound on the close handshake at shutdown.
    pub shutdown_grace: Duration,
    /// Capacity of the client event queue.
    pub event_buffer: usize,
    /// Bot display name used in replies.
    pub bot_name: String,
    /// Command prefix character.
    pub command_prefix: char,
    /// Version string reported by `info`.
    pub version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            shutdown_grace: Duration::from_secs(5),
            event_buffer: 256,
            bot_name: "Casper2".to_string(),
            command_prefix: '!',
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// ── Manager ──────────────────────────────────────────────────

/// Owns the session and runs its event loop.
pub struct SessionManager {
    config: SessionConfig,
    ctx: SessionContext,
    client: Arc<dyn ProtocolClient>,
    router: Router,
    events_tx: mpsc::Sender<ClientEvent>,
    events_rx: mpsc::Receiver<ClientEvent>,
    due_tx: mpsc::Sender<u64>,
    due_rx: mpsc::Receiver<u64>,
    snapshot_tx: watch::Sender<Arc<SessionSnapshot>>,
    started_at: Instant,
}

impl SessionManager {
    /// Create a manager in [`SessionState::Idle`]. Nothing connects until
    /// [`run`](Self::run).
    #[must_use]
    pub fn new(
        config: SessionConfig,
        client: Arc<dyn ProtocolClient>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let (due_tx, due_rx) = mpsc::channel(DUE_CHANNEL_CAPACITY);
        let ctx = SessionContext::new(store);
        let (snapshot_tx, _) = watch::channel(Arc::new(ctx.snapshot()));
        let router = Router::new(config.command_prefix);

        Self {
            config,
            ctx,
            client,
            router,
            events_tx,
            events_rx,
            due_tx,
            due_rx,
            snapshot_tx,
            started_at: Instant::now(),
        }
    }

    /// Measure uptime from `started_at` instead of from construction.
    #[must_use]
    pub fn with_started_at(mut self, started_at: Instant) -> Self {
        self.started_at = started_at;
        self
    }

    /// A reader for the session snapshot.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.snapshot_tx.subscribe())
    }

    /// Start the session and process events until `shutdown_rx` fires.
    ///
    /// On shutdown the reconnect timer is cancelled and, if a connection
    /// is active, the client's close handshake runs within the configured
    /// grace period.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(bot = %self.config.bot_name, "Session manager starting");
        self.dispatch(SessionEvent::Start).await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Session manager received shutdown signal");
                    break;
                }

                Some(event) = self.events_rx.recv() => {
                    self.handle_client_event(event).await;
                }

                Some(generation) = self.due_rx.recv() => {
                    self.handle_reconnect_due(generation).await;
                }

                else => break,
            }
        }

        self.shutdown().await;
    }

    // ── Event handling ───────────────────────────────────────

    async fn handle_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Qr(payload) => self.dispatch(SessionEvent::QrReceived(payload)).await,
            ClientEvent::ConnectionOpen => self.dispatch(SessionEvent::ConnectionOpen).await,
            ClientEvent::ConnectionClosed { status_code } => {
                let reason = DisconnectReason::from_code(status_code);
                self.dispatch(SessionEvent::ConnectionClosed(reason)).await;
            },
            ClientEvent::CredentialsUpdated(credentials) => {
                self.persist_credentials(&credentials).await;
            },
            ClientEvent::Message(message) => self.handle_message(&message).await,
        }
    }

    async fn handle_reconnect_due(&mut self, generation: u64) {
        if self.ctx.reconnect.take_due(generation) {
            self.dispatch(SessionEvent::ReconnectDue).await;
        } else {
            trace!(generation, "Dropping stale reconnect tick");
        }
    }

    /// Run `event` through the machine, then any follow-up events its
    /// effects produce.
    async fn dispatch(&mut self, event: SessionEvent) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let from = self.ctx.state;
            let transition = machine::transition(from, &event);
            if transition.is_ignored(from) {
                debug!(state = %from, ?event, "Ignoring event");
                continue;
            }

            if let SessionEvent::ConnectionClosed(reason) = &event {
                self.ctx.last_disconnect = Some(*reason);
            }
            if transition.next != from {
                info!(from = %from, to = %transition.next, "Session state changed");
            }
            self.ctx.state = transition.next;

            for effect in transition.effects {
                if let Some(follow_up) = self.apply(effect).await {
                    queue.push_back(follow_up);
                }
            }
            self.publish();
        }
    }

    async fn apply(&mut self, effect: Effect) -> Option<SessionEvent> {
        match effect {
            Effect::Connect => return self.connect().await,
            Effect::ReplaceChallenge(payload) => {
                info!(
                    len = payload.len(),
                    "Pairing QR received; scan it from Linked Devices"
                );
                self.ctx.challenge = Some(PairingChallenge::new(payload));
            },
            Effect::ClearChallenge => self.ctx.challenge = None,
            Effect::ResetAttempts => {
                if self.ctx.attempts > 0 {
                    info!(attempts = self.ctx.attempts, "Reconnected");
                }
                self.ctx.attempts = 0;
            },
            Effect::InvalidateCredentials => {
                self.ctx.credentials_valid = false;
                error!("Logged out by the account; re-pair with --reset-credentials");
            },
            Effect::ScheduleReconnect => {
                self.ctx.attempts = self.ctx.attempts.saturating_add(1);
                let delay = self.config.reconnect_delay;
                self.ctx.reconnect.schedule(delay, self.due_tx.clone());
                info!(
                    attempt = self.ctx.attempts,
                    delay_ms = delay.as_millis(),
                    reason = ?self.ctx.last_disconnect,
                    "Reconnecting after delay"
                );
            },
            Effect::CancelReconnect => self.ctx.reconnect.cancel(),
        }
        None
    }

    /// Load credentials and open the client. A failed attempt is reported
    /// back as a lost connection so the retry policy applies.
    async fn connect(&mut self) -> Option<SessionEvent> {
        let credentials = match self.ctx.store.load().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Failed to load credentials; starting a fresh pairing");
                None
            },
        };
        self.ctx.credentials_valid = credentials.is_some();
        info!(
            has_credentials = credentials.is_some(),
            "Connecting to messaging bridge"
        );
        self.publish();

        match self.client.connect(credentials, self.events_tx.clone()).await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Connect attempt failed");
                Some(SessionEvent::ConnectionClosed(
                    DisconnectReason::ConnectionLost,
                ))
            },
        }
    }

    /// Persist a rotated blob before the next event is taken. Failure is
    /// logged and the session carries on.
    async fn persist_credentials(&mut self, credentials: &Credentials) {
        if self.ctx.state.is_terminal() {
            debug!("Ignoring credential update after logout");
            return;
        }

        match self.ctx.store.save(credentials).await {
            Ok(()) => debug!(len = credentials.len(), "Persisted credentials"),
            Err(e) => warn!(
                error = %e,
                "Failed to persist credentials; a restart may require re-pairing"
            ),
        }
        self.ctx.credentials_valid = true;
        self.publish();
    }

    async fn handle_message(&self, message: &InboundMessage) {
        if message.from_me {
            trace!("Filtering self-message");
            return;
        }

        let Some(text) = message
            .content
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            trace!(from = %message.from, "Dropping message without text");
            return;
        };

        if self.ctx.state != SessionState::Online {
            trace!(state = %self.ctx.state, "Dropping message received while not online");
            return;
        }

        debug!(from = %message.from, "Message received");

        let now: DateTime<FixedOffset> = Local::now().into();
        let ctx = CommandContext {
            sender: &message.from,
            uptime: self.started_at.elapsed(),
            state: self.ctx.state,
            bot_name: &self.config.bot_name,
            version: &self.config.version,
            now,
        };
        let Some(reply) = self.router.route(text, &ctx) else {
            return;
        };

        match self.client.send(&reply.to, &reply.text).await {
            Ok(()) => debug!(to = %reply.to, "Reply sent"),
            Err(e) => warn!(to = %reply.to, error = %e, "Failed to send reply; dropping it"),
        }
    }

    // ── Publication & shutdown ───────────────────────────────

    fn publish(&self) {
        let snapshot = self.ctx.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if **current == snapshot {
                false
            } else {
                *current = Arc::new(snapshot);
                true
            }
        });
    }

    async fn shutdown(&mut self) {
        self.ctx.reconnect.cancel();

        if self.ctx.state.is_active() {
            let grace = self.config.shutdown_grace;
            match tokio::time::timeout(grace, self.client.disconnect()).await {
                Ok(Ok(())) => info!("Session closed"),
                Ok(Err(e)) => warn!(error = %e, "Session close handshake failed"),
                Err(_) => warn!(
                    grace_ms = grace.as_millis(),
                    "Session close handshake timed out"
                ),
            }
        }

        info!("Session manager stopped");
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("ctx", &self.ctx)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
