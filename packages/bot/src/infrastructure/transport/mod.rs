//! Connection to the room service.
//!
//! ## 概要
//!
//! セッション層はこのモジュールの trait（`Connector` / `Connection`）にだけ
//! 依存し、具体的な通信方式（Socket.IO over WebSocket）には依存しない。
//!
//! - `Connector`: ホストへの接続を確立する
//! - `Connection`: 受信イベントのストリームと送信ハンドル（`Outbound`）を提供する
//! - `socketio`: Engine.IO v4 / Socket.IO を WebSocket 上で話す実装

mod event;
#[cfg(test)]
pub(crate) mod memory;
mod packet;
mod socketio;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

pub use event::ConnectionEvent;
pub use socketio::{SocketIoConnector, endpoint_url};

/// Transport-level failures on the active host
#[derive(Debug, Error)]
pub enum TransportError {
    /// The host could not be reached or the WebSocket upgrade failed
    #[error("Connection error: {0}")]
    Connect(String),

    /// The Engine.IO / Socket.IO handshake did not complete
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// The service refused the connection (`connect_error`)
    #[error("Connection rejected: {0}")]
    Rejected(String),

    /// No handshake progress within the timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The host cannot be turned into a WebSocket endpoint
    #[error("Invalid host URL '{0}'")]
    InvalidUrl(String),
}

/// Event queued for the service
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Cloneable, best-effort sender bound to one connection.
///
/// Sending never fails loudly: once the connection is gone messages are
/// dropped and logged at debug level.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbound {
    pub fn new(tx: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { tx }
    }

    /// Queue a raw JSON payload. Returns `false` if it was dropped.
    pub fn send(&self, event: &str, payload: serde_json::Value) -> bool {
        let message = OutboundMessage {
            event: event.to_string(),
            payload,
        };
        match self.tx.send(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Dropped outbound '{}': connection closed", e.0.event);
                false
            }
        }
    }

    /// Serialize and queue a payload. Returns `false` if it was dropped.
    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) -> bool {
        match serde_json::to_value(payload) {
            Ok(value) => self.send(event, value),
            Err(e) => {
                tracing::error!("Failed to serialize '{}' payload: {}", event, e);
                false
            }
        }
    }
}

/// Establishes connections to candidate hosts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `host` (e.g. `https://classic.talkomatic.co`)
    async fn connect(&self, host: &str) -> Result<Box<dyn Connection>, TransportError>;
}

/// One live connection to the room service
#[async_trait]
pub trait Connection: Send {
    /// Handle for queueing outbound events on this connection
    fn outbound(&self) -> Outbound;

    /// Next inbound event; `None` once the connection is gone
    async fn next_event(&mut self) -> Option<ConnectionEvent>;

    /// Flush queued events (bounded wait) and close
    async fn close(&mut self);
}
