//! Configuration struct definitions.
//!
//! Every section derives `Deserialize` with `#[serde(default)]`, so a user
//! file only needs to name the fields it changes. The embedded
//! `defaults.toml` and the `Default` impls below carry the same values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Status surface listener.
    pub http: HttpSection,
    /// Session lifecycle and bridge transport.
    pub session: SessionSection,
    /// Bot identity and command syntax.
    pub bot: BotSection,
    /// Logging.
    pub log: LogSection,
}

// ---------------------------------------------------------------------------
// HttpSection
// ---------------------------------------------------------------------------

/// HTTP status surface settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Interface to bind.
    pub bind: String,
    /// TCP port. Falls back to `PORT` when no file sets it.
    pub port: u16,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

impl HttpSection {
    /// `bind:port` as a socket address string.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

// ---------------------------------------------------------------------------
// SessionSection
// ---------------------------------------------------------------------------

/// Session lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// `WebSocket` URL of the messaging bridge.
    pub bridge_url: String,
    /// Directory holding the persisted credentials blob.
    pub auth_dir: String,
    /// Fixed delay before a reconnect after a non-fatal close.
    pub reconnect_delay_ms: u64,
    /// How long a reply send waits for the bridge acknowledgement.
    pub send_timeout_ms: u64,
    /// Upper bound on the session-close handshake at shutdown.
    pub shutdown_grace_ms: u64,
    /// Capacity of the inbound event queue.
    pub event_buffer: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            bridge_url: "ws://127.0.0.1:8085".to_owned(),
            auth_dir: "auth_info".to_owned(),
            reconnect_delay_ms: 3000,
            send_timeout_ms: 10_000,
            shutdown_grace_ms: 5000,
            event_buffer: 256,
        }
    }
}

impl SessionSection {
    /// Reconnect delay as a [`Duration`].
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Send acknowledgement timeout as a [`Duration`].
    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// ---------------------------------------------------------------------------
// BotSection
// ---------------------------------------------------------------------------

/// Bot identity settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// Display name used in replies and on the status page.
    pub name: String,
    /// Single character that marks a command (`!ping`).
    pub command_prefix: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            name: "Casper2".to_owned(),
            command_prefix: "!".to_owned(),
        }
    }
}

impl BotSection {
    /// The prefix as a `char`. Validation guarantees exactly one.
    #[must_use]
    pub fn prefix_char(&self) -> char {
        self.command_prefix.chars().next().unwrap_or('!')
    }
}

// ---------------------------------------------------------------------------
// LogSection
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Level filter (`info`, `debug`, ...). Falls back to `CASPER_LOG`.
    pub level: String,
    /// One of `pretty`, `compact`, `json`, `full`.
    pub format: String,
    /// When set, logs go to daily-rotated files here instead of stderr.
    pub directory: Option<String>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directory: None,
        }
    }
}
