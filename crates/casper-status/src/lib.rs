#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Read-only HTTP status surface for the Casper session runtime.
//!
//! - `GET /`: an HTML page that reloads itself every few seconds and shows
//!   the pairing QR code while one is live.
//! - `GET /status`: the same data as camelCase JSON.
//!
//! Neither endpoint mutates anything. Both read the latest
//! [`SessionSnapshot`](casper_session::SessionSnapshot) through a
//! [`SessionHandle`](casper_session::SessionHandle).

mod error;
pub mod page;
mod report;
mod server;

pub use error::{StatusError, StatusResult};
pub use report::StatusReport;
pub use server::{StatusState, bind, router, serve};
