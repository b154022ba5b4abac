//! Connection lifecycle state.

use std::fmt;

/// Where the controller is in the connect → join → joined cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not connected; terminal once the host list is exhausted
    #[default]
    Disconnected,
    Connecting(String),
    /// Connected, waiting for a join confirmation. `attempt` counts the join
    /// requests sent so far on this connection.
    AwaitingJoin { host: String, attempt: usize },
    Joined(String),
}

impl SessionState {
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined(_))
    }

    /// Host of the current connection, if any
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Disconnected => None,
            Self::Connecting(host) | Self::Joined(host) => Some(host),
            Self::AwaitingJoin { host, .. } => Some(host),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting(host) => write!(f, "connecting to {}", host),
            Self::AwaitingJoin { host, attempt } => {
                write!(f, "awaiting join on {} (attempt {})", host, attempt)
            }
            Self::Joined(host) => write!(f, "joined on {}", host),
        }
    }
}
