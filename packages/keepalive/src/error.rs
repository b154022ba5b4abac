//! Error types for the liveness endpoint.

use thiserror::Error;

/// Liveness server errors
#[derive(Debug, Error)]
pub enum KeepaliveError {
    /// Failed to bind the listening socket
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error
    #[error("Liveness server error: {0}")]
    Serve(#[from] std::io::Error),
}
