//! Status server error types.

use thiserror::Error;

/// Errors from the status server.
#[derive(Debug, Error)]
pub enum StatusError {
    /// The listener could not be bound.
    #[error("failed to bind status server on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("status server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Result type for status server operations.
pub type StatusResult<T> = Result<T, StatusError>;
