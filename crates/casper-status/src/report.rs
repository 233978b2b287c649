//! The data every status view renders.

use std::time::Duration;

use casper_session::{SessionSnapshot, SessionState};
use serde::Serialize;

/// Point-in-time status, serialized as the `/status` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Whether the session is online.
    pub connected: bool,
    /// Whole seconds since process start.
    pub uptime_seconds: u64,
    /// Live pairing payload, `null` when none.
    pub qr_payload: Option<String>,
    /// Lifecycle state.
    pub state: SessionState,
    /// Consecutive reconnects since the last open.
    pub reconnect_attempts: u32,
}

impl StatusReport {
    /// Build a report from a snapshot and the process uptime.
    #[must_use]
    pub fn new(snapshot: &SessionSnapshot, uptime: Duration) -> Self {
        Self {
            connected: snapshot.is_connected(),
            uptime_seconds: uptime.as_secs(),
            qr_payload: snapshot.qr_payload().map(str::to_owned),
            state: snapshot.state,
            reconnect_attempts: snapshot.reconnect_attempts,
        }
    }
}
