//! Mutable session state, owned by the manager task.

use std::sync::Arc;

use casper_storage::CredentialStore;

use crate::snapshot::SessionSnapshot;
use crate::state::{DisconnectReason, PairingChallenge, SessionState};
use crate::timer::ReconnectTimer;

/// Everything the lifecycle manager mutates.
///
/// Owned by exactly one task and never shared, so none of it is locked.
/// Other tasks read [`SessionSnapshot`]s instead.
pub(crate) struct SessionContext {
    /// Lifecycle state.
    pub(crate) state: SessionState,
    /// Live pairing challenge.
    pub(crate) challenge: Option<PairingChallenge>,
    /// Where the credentials live. The context never caches the blob.
    pub(crate) store: Arc<dyn CredentialStore>,
    /// Whether usable credentials are held.
    pub(crate) credentials_valid: bool,
    /// Pending reconnect, if any.
    pub(crate) reconnect: ReconnectTimer,
    /// Consecutive reconnects since the last open.
    pub(crate) attempts: u32,
    /// Why the last connection closed.
    pub(crate) last_disconnect: Option<DisconnectReason>,
}

impl SessionContext {
    /// Fresh context in [`SessionState::Idle`].
    #[must_use]
    pub(crate) fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            state: SessionState::Idle,
            challenge: None,
            store,
            credentials_valid: false,
            reconnect: ReconnectTimer::new(),
            attempts: 0,
            last_disconnect: None,
        }
    }

    /// Copy out the observable fields.
    #[must_use]
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            challenge: self.challenge.clone(),
            credentials_valid: self.credentials_valid,
            reconnect_attempts: self.attempts,
            last_disconnect: self.last_disconnect,
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.state)
            .field("challenge", &self.challenge)
            .field("credentials_valid", &self.credentials_valid)
            .field("reconnect", &self.reconnect)
            .field("attempts", &self.attempts)
            .field("last_disconnect", &self.last_disconnect)
            .finish_non_exhaustive()
    }
}
