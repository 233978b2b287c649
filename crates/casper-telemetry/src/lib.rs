//! Logging setup for the Casper chat-bot runtime.
//!
//! ```rust,no_run
//! use casper_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), casper_telemetry::TelemetryError> {
//! let config = LogConfig::new("info,casper_bridge=debug").with_format(LogFormat::Json);
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogOutput, setup_logging};
