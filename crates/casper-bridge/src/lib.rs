#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! `WebSocket` bridge client for the Casper session runtime.
//!
//! The messaging protocol itself runs in a separate bridge process. This
//! crate connects to it, translates its JSON frames into
//! [`ClientEvent`](casper_session::ClientEvent)s, and correlates outbound
//! sends with their acknowledgements.
//!
//! # Wire format
//!
//! | Direction | Frame |
//! |---|---|
//! | → bridge | `connect {credentials}`, `send {id, to, text}`, `disconnect` |
//! | ← bridge | `qr {payload}`, `open`, `close {status_code}`, `creds {credentials}`, `message {from, from_me, content}`, `send_ack {id, error?}` |
//!
//! A socket that drops without a `close` frame is reported as close code
//! 428.

mod client;
mod connection;
mod error;
pub mod protocol;

pub use client::{BridgeClient, BridgeConfig};
pub use error::BridgeError;
