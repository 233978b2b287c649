#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Casper session runtime.
//!
//! The core of the bot: a lifecycle manager that keeps one messaging
//! session connected, pairs it by QR code, persists its credentials, and
//! retries after a fixed delay when the link drops. Inbound text is
//! matched against a small command table and answered through the same
//! session.
//!
//! # Architecture
//!
//! ```text
//! ProtocolClient ──ClientEvent──► SessionManager ──► Router
//!       ▲                              │
//!       └────────── send ◄─────────────┤
//!                                      ▼
//!                         watch<SessionSnapshot> ──► status page
//! ```
//!
//! The manager is the only writer of session state. Everyone else reads
//! [`SessionSnapshot`]s through a [`SessionHandle`].

pub mod client;
mod context;
pub mod error;
pub mod machine;
pub mod manager;
pub mod message;
pub mod router;
pub mod snapshot;
pub mod state;
pub mod timer;

pub use client::{ClientEvent, ProtocolClient};
pub use error::{ProtocolError, ProtocolResult};
pub use machine::{Effect, SessionEvent, Transition, transition};
pub use manager::{SessionConfig, SessionManager};
pub use message::{CommandReply, InboundMessage, MessageContent};
pub use router::{Command, CommandContext, Router};
pub use snapshot::{SessionHandle, SessionSnapshot};
pub use state::{DisconnectReason, PairingChallenge, SessionState};
pub use timer::ReconnectTimer;

/// Re-exported so callers can build a manager without naming the storage crate.
pub use casper_storage::{CredentialStore, Credentials};
