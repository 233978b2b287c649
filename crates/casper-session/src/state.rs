//! Session state, disconnect reasons, and the pairing challenge.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Session State ────────────────────────────────────────────

/// Connection lifecycle state. Only the session manager changes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not started yet.
    #[default]
    Idle,
    /// A connect attempt is in flight.
    Connecting,
    /// The transport is up and waiting for the user to scan a QR code.
    AwaitingPairing,
    /// Authenticated and exchanging messages.
    Online,
    /// Dropped for a recoverable reason. A reconnect is scheduled.
    Closed,
    /// The account logged this device out. Needs re-pairing by hand.
    FatalLoggedOut,
}

impl SessionState {
    /// Snake-case name, as used in logs and the status JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::AwaitingPairing => "awaiting_pairing",
            Self::Online => "online",
            Self::Closed => "closed",
            Self::FatalLoggedOut => "fatal_logged_out",
        }
    }

    /// Whether a transport connection is open or being opened.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::AwaitingPairing | Self::Online)
    }

    /// Whether no event can move the session out of this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::FatalLoggedOut)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Disconnect Reasons ───────────────────────────────────────

/// Known transport close codes.
pub mod close_code {
    /// The account removed this linked device.
    pub const LOGGED_OUT: u16 = 401;
    /// The server refused the session.
    pub const FORBIDDEN: u16 = 403;
    /// The link timed out.
    pub const CONNECTION_LOST: u16 = 408;
    /// Multi-device state disagrees with the server.
    pub const MULTIDEVICE_MISMATCH: u16 = 411;
    /// The transport closed without a reason.
    pub const CONNECTION_CLOSED: u16 = 428;
    /// Another client took over this session.
    pub const CONNECTION_REPLACED: u16 = 440;
    /// The stored session is corrupt.
    pub const BAD_SESSION: u16 = 500;
    /// The service is unavailable.
    pub const UNAVAILABLE_SERVICE: u16 = 503;
    /// The server asks for a fresh connection, usually right after pairing.
    pub const RESTART_REQUIRED: u16 = 515;
}

/// Typed view of a close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// 401.
    LoggedOut,
    /// 403.
    Forbidden,
    /// 408. Also used when a connect attempt fails outright.
    ConnectionLost,
    /// 411.
    MultideviceMismatch,
    /// 428. Also used when the transport drops with no close code.
    ConnectionClosed,
    /// 440.
    ConnectionReplaced,
    /// 500.
    BadSession,
    /// 503.
    UnavailableService,
    /// 515.
    RestartRequired,
    /// Any code not listed above.
    Other(u16),
}

impl DisconnectReason {
    /// Map a raw close code.
    #[must_use]
    pub const fn from_code(code: u16) -> Self {
        match code {
            close_code::LOGGED_OUT => Self::LoggedOut,
            close_code::FORBIDDEN => Self::Forbidden,
            close_code::CONNECTION_LOST => Self::ConnectionLost,
            close_code::MULTIDEVICE_MISMATCH => Self::MultideviceMismatch,
            close_code::CONNECTION_CLOSED => Self::ConnectionClosed,
            close_code::CONNECTION_REPLACED => Self::ConnectionReplaced,
            close_code::BAD_SESSION => Self::BadSession,
            close_code::UNAVAILABLE_SERVICE => Self::UnavailableService,
            close_code::RESTART_REQUIRED => Self::RestartRequired,
            other => Self::Other(other),
        }
    }

    /// The raw close code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::LoggedOut => close_code::LOGGED_OUT,
            Self::Forbidden => close_code::FORBIDDEN,
            Self::ConnectionLost => close_code::CONNECTION_LOST,
            Self::MultideviceMismatch => close_code::MULTIDEVICE_MISMATCH,
            Self::ConnectionClosed => close_code::CONNECTION_CLOSED,
            Self::ConnectionReplaced => close_code::CONNECTION_REPLACED,
            Self::BadSession => close_code::BAD_SESSION,
            Self::UnavailableService => close_code::UNAVAILABLE_SERVICE,
            Self::RestartRequired => close_code::RESTART_REQUIRED,
            Self::Other(code) => code,
        }
    }

    /// Only a logout is fatal. Everything else is retried.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::LoggedOut)
    }
}

impl From<u16> for DisconnectReason {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoggedOut => "logged out",
            Self::Forbidden => "forbidden",
            Self::ConnectionLost => "connection lost",
            Self::MultideviceMismatch => "multi-device mismatch",
            Self::ConnectionClosed => "connection closed",
            Self::ConnectionReplaced => "connection replaced",
            Self::BadSession => "bad session",
            Self::UnavailableService => "service unavailable",
            Self::RestartRequired => "restart required",
            Self::Other(_) => "unknown",
        };
        write!(f, "{name} ({})", self.code())
    }
}

// ── Pairing Challenge ────────────────────────────────────────

/// The QR payload the user must scan to pair this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingChallenge {
    /// Opaque QR payload.
    pub payload: String,
    /// When the protocol client produced it.
    pub generated_at: DateTime<Utc>,
}

impl PairingChallenge {
    /// Wrap a payload received now.
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            generated_at: Utc::now(),
        }
    }
}
