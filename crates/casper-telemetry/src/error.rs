//! Telemetry error types.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons logging could not be installed.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The level or a directive is not a valid `EnvFilter` expression.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// The rejected expression.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// The format name is not one of the supported ones.
    #[error("unknown log format `{0}` (expected pretty, compact, json or full)")]
    UnknownFormat(String),

    /// The log directory could not be created.
    #[error("cannot create log directory {}: {source}", path.display())]
    LogDirectory {
        /// Requested directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Another global subscriber got there first.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
