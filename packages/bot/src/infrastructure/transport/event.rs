//! Inbound protocol events.

use serde::de::DeserializeOwned;

use crate::domain::Identity;
use crate::infrastructure::dto::socketio::{
    ChatUpdatePayload, RoomJoinedPayload, UserDto, events,
};

/// Tagged event delivered by a [`Connection`](super::Connection)
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The service accepted the connection
    Connected,
    /// The service refused the connection
    ConnectError(String),
    /// `error` event
    ServerError(serde_json::Value),
    /// `notice` event
    Notice(serde_json::Value),
    /// Join confirmation
    RoomJoined(RoomJoinedPayload),
    UserJoined(UserDto),
    UserLeft(Identity),
    ChatUpdate(ChatUpdatePayload),
}

impl ConnectionEvent {
    /// Map a named Socket.IO event to a [`ConnectionEvent`].
    ///
    /// Unknown events and payloads that do not parse are logged and
    /// skipped. A malformed join confirmation still counts as one, with an
    /// empty roster.
    pub fn from_socket_event(name: &str, payload: serde_json::Value) -> Option<Self> {
        match name {
            events::ERROR => Some(Self::ServerError(payload)),
            events::NOTICE => Some(Self::Notice(payload)),
            events::ROOM_JOINED => Some(Self::RoomJoined(
                parse(name, payload).unwrap_or_default(),
            )),
            events::USER_JOINED => parse(name, payload).map(Self::UserJoined),
            events::USER_LEFT => {
                // usually a bare id, occasionally wrapped in an object
                let identity = Identity::from_json(&payload)
                    .or_else(|| payload.get("id").and_then(Identity::from_json))
                    .or_else(|| payload.get("userId").and_then(Identity::from_json));
                if identity.is_none() {
                    tracing::debug!("Ignoring '{}' without identity: {}", name, payload);
                }
                identity.map(Self::UserLeft)
            }
            events::CHAT_UPDATE => parse(name, payload).map(Self::ChatUpdate),
            _ => {
                tracing::debug!("Ignoring unhandled event '{}'", name);
                None
            }
        }
    }
}

fn parse<T: DeserializeOwned>(name: &str, payload: serde_json::Value) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Malformed '{}' payload: {}", name, e);
            None
        }
    }
}
