//! Read-only view of the session for other tasks.

use std::sync::Arc;

use tokio::sync::watch;

use crate::state::{DisconnectReason, PairingChallenge, SessionState};

/// Immutable copy of the observable session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Lifecycle state.
    pub state: SessionState,
    /// Live pairing challenge, if any.
    pub challenge: Option<PairingChallenge>,
    /// Whether usable credentials are held. Cleared on logout.
    pub credentials_valid: bool,
    /// Consecutive reconnects since the last successful open.
    pub reconnect_attempts: u32,
    /// Why the last connection closed.
    pub last_disconnect: Option<DisconnectReason>,
}

impl SessionSnapshot {
    /// Whether the session is online.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Online
    }

    /// The pairing QR payload, if one is live.
    #[must_use]
    pub fn qr_payload(&self) -> Option<&str> {
        self.challenge.as_ref().map(|c| c.payload.as_str())
    }
}

/// Cheap, cloneable reader of the latest [`SessionSnapshot`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Arc<SessionSnapshot>>,
}

impl SessionHandle {
    /// Wrap a snapshot receiver. [`SessionManager::handle`] is the usual
    /// source; anything else holding the sender can drive it too.
    ///
    /// [`SessionManager::handle`]: crate::SessionManager::handle
    #[must_use]
    pub fn new(rx: watch::Receiver<Arc<SessionSnapshot>>) -> Self {
        Self { rx }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.rx.borrow())
    }

    /// A receiver that is notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.rx.clone()
    }

    /// Wait until `predicate` holds for the current snapshot.
    ///
    /// Returns `None` if the manager went away first.
    pub async fn wait_until(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<Arc<SessionSnapshot>> {
        let mut rx = self.rx.clone();
        rx.wait_for(|snap| predicate(snap.as_ref()))
            .await
            .ok()
            .map(|snap| Arc::clone(&snap))
    }
}
