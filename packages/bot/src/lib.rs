//! Jumble Clanker: a Talkomatic room bot that mirrors every occupant's live
//! text and types back jumbled phrases built from recent messages.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use infrastructure::transport::{SocketIoConnector, TransportError};
pub use session::{SessionController, SessionError, SessionState};
