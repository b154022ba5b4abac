//! Socket.IO event names and payload DTOs of the room service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::Identity;

/// Event names used on the wire
pub mod events {
    pub const JOIN_LOBBY: &str = "join lobby";
    pub const JOIN_ROOM: &str = "join room";
    pub const JOIN_ROOM_CODE: &str = "join room code";
    pub const CHAT_UPDATE: &str = "chat update";
    pub const ROOM_JOINED: &str = "room joined";
    pub const USER_JOINED: &str = "user joined";
    pub const USER_LEFT: &str = "user left";
    pub const ERROR: &str = "error";
    pub const NOTICE: &str = "notice";
}

// ========================================
// Outbound
// ========================================

/// Presence announcement sent to the lobby right after connecting
#[derive(Debug, Clone, Serialize)]
pub struct LobbyAnnouncement {
    pub username: String,
    pub location: String,
    #[serde(rename = "guestId")]
    pub guest_id: String,
}

/// Outbound `chat update` carrying our own visible text
#[derive(Debug, Clone, Serialize)]
pub struct EditUpdate {
    pub diff: FullReplaceDiff,
}

/// The only diff shape we send: replace our whole text
#[derive(Debug, Clone, Serialize)]
pub struct FullReplaceDiff {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl EditUpdate {
    pub fn full_replace(text: impl Into<String>) -> Self {
        Self {
            diff: FullReplaceDiff {
                kind: DiffDto::FULL_REPLACE,
                text: text.into(),
            },
        }
    }
}

// ========================================
// Inbound
// ========================================

/// Occupant as listed in `room joined` and `user joined`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDto {
    #[serde(default, deserialize_with = "Identity::deserialize_optional")]
    pub id: Option<Identity>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Join confirmation payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomJoinedPayload {
    #[serde(default)]
    pub users: Vec<UserDto>,
    /// Identity → current text. Values that are not strings are ignored.
    #[serde(default, rename = "currentMessages")]
    pub current_messages: HashMap<String, serde_json::Value>,
}

/// Incremental edit as sent by other occupants
#[derive(Debug, Clone, Deserialize)]
pub struct DiffDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub index: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub count: Option<f64>,
}

impl DiffDto {
    pub const FULL_REPLACE: &'static str = "full-replace";
    pub const ADD: &'static str = "add";
    pub const DELETE: &'static str = "delete";
    pub const REPLACE: &'static str = "replace";
}

/// Inbound `chat update`.
///
/// A present `diff` selects the incremental path; otherwise a string
/// `message` is a finalized message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatUpdatePayload {
    #[serde(
        default,
        rename = "userId",
        deserialize_with = "Identity::deserialize_optional"
    )]
    pub user_id: Option<Identity>,
    #[serde(default)]
    pub diff: Option<DiffDto>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}
