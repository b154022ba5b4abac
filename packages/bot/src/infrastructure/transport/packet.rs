//! Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Only what a text-only client on the default namespace needs: binary
//! attachments are not supported and acknowledgement ids are skipped.

use serde::Deserialize;
use thiserror::Error;

/// Engine.IO pong, the reply to a server ping
pub const PONG: &str = "3";

/// Socket.IO DISCONNECT for the default namespace
pub const SOCKET_DISCONNECT: &str = "41";

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("Empty packet")]
    Empty,

    #[error("Unknown packet type '{0}'")]
    UnknownType(char),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed event packet")]
    MalformedEvent,
}

/// Engine.IO OPEN handshake data
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenInfo),
    Close,
    Ping(String),
    Pong(String),
    /// Socket.IO packet carried in an Engine.IO MESSAGE
    Message(String),
    Upgrade,
    Noop,
}

/// Socket.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<serde_json::Value>),
    Disconnect,
    Event {
        name: String,
        payload: serde_json::Value,
    },
    ConnectError(serde_json::Value),
    /// Acks and binary packets, which this client does not use
    Other(char),
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let body = chars.as_str();
        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(body)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(body.to_string())),
            '3' => Ok(Self::Pong(body.to_string())),
            '4' => Ok(Self::Message(body.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(PacketError::UnknownType(other)),
        }
    }
}

impl SocketPacket {
    pub fn decode(text: &str) -> Result<Self, PacketError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(PacketError::Empty)?;
        let body = strip_ack_id(strip_namespace(chars.as_str()));
        match kind {
            '0' => {
                let data = if body.is_empty() {
                    None
                } else {
                    Some(serde_json::from_str(body)?)
                };
                Ok(Self::Connect(data))
            }
            '1' => Ok(Self::Disconnect),
            '2' => {
                let value: serde_json::Value = serde_json::from_str(body)?;
                let serde_json::Value::Array(mut items) = value else {
                    return Err(PacketError::MalformedEvent);
                };
                if items.is_empty() {
                    return Err(PacketError::MalformedEvent);
                }
                let name = match items.remove(0) {
                    serde_json::Value::String(name) => name,
                    _ => return Err(PacketError::MalformedEvent),
                };
                let payload = if items.is_empty() {
                    serde_json::Value::Null
                } else {
                    items.remove(0)
                };
                Ok(Self::Event { name, payload })
            }
            '4' => {
                let data = if body.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::from_str(body)?
                };
                Ok(Self::ConnectError(data))
            }
            '3' | '5' | '6' => Ok(Self::Other(kind)),
            other => Err(PacketError::UnknownType(other)),
        }
    }
}

/// Skip a `/namespace,` prefix
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

/// Skip a numeric acknowledgement id
fn strip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Socket.IO CONNECT on the default namespace with auth data
pub fn encode_connect(auth: &serde_json::Value) -> String {
    format!("40{}", auth)
}

/// Socket.IO EVENT on the default namespace
pub fn encode_event(event: &str, payload: &serde_json::Value) -> String {
    let frame = serde_json::Value::Array(vec![
        serde_json::Value::String(event.to_string()),
        payload.clone(),
    ]);
    format!("42{}", frame)
}

/// Human readable reason from a CONNECT_ERROR payload
pub fn connect_error_reason(data: &serde_json::Value) -> String {
    data.get("message")
        .and_then(serde_json::Value::as_str)
        .or_else(|| data.as_str())
        .map_or_else(|| data.to_string(), str::to_string)
}
