#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Credential persistence for the Casper session runtime.
//!
//! The session credentials are an opaque blob produced by the protocol
//! client. This crate only stores and returns it:
//!
//! - [`CredentialStore`]: the async trait the session manager depends on
//! - [`FileCredentialStore`]: one file per auth directory, replaced atomically
//! - [`MemoryCredentialStore`]: for tests and throwaway sessions

mod credentials;
mod error;
mod file;
mod store;

pub use credentials::Credentials;
pub use error::{StorageError, StorageResult};
pub use file::{CREDENTIALS_FILE, FileCredentialStore};
pub use store::{CredentialStore, MemoryCredentialStore};
