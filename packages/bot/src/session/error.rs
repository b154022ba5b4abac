//! Session error types.

use thiserror::Error;

use crate::infrastructure::transport::TransportError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Connecting to, or talking to, a host failed
    #[error("Transport error on {host}: {source}")]
    Transport {
        host: String,
        #[source]
        source: TransportError,
    },

    /// The connection dropped after it was established
    #[error("Connection to {host} lost")]
    ConnectionLost { host: String },

    /// No join request shape was acknowledged
    #[error("No join confirmation from {host} after {attempts} attempts")]
    JoinExhausted { host: String, attempts: usize },

    /// Every candidate host failed
    #[error("All hosts exhausted")]
    HostsExhausted,
}
