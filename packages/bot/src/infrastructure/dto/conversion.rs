//! Conversion logic between DTOs and domain entities.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::{EditOperation, Identity, RosterMember};
use crate::infrastructure::dto::socketio as dto;

/// Display name used when the service omits one.
pub const ANONYMOUS: &str = "Anonymous";

/// Reasons a wire DTO cannot become a domain value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Unknown diff type '{0}'")]
    UnknownDiffType(String),

    #[error("User entry has no id")]
    MissingIdentity,
}

/// Wire numbers may be negative, fractional or absurdly large; clamp them
/// to a char index.
fn to_index(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value as usize
    } else {
        0
    }
}

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<dto::DiffDto> for EditOperation {
    type Error = ConversionError;

    fn try_from(diff: dto::DiffDto) -> Result<Self, Self::Error> {
        let text = diff.text.unwrap_or_default();
        match diff.kind.as_str() {
            dto::DiffDto::FULL_REPLACE => Ok(Self::FullReplace(text)),
            dto::DiffDto::ADD => Ok(Self::Insert {
                // no index means "append"; out-of-range indices clamp to the end
                index: diff.index.map_or(usize::MAX, to_index),
                text,
            }),
            dto::DiffDto::DELETE => Ok(Self::Delete {
                index: diff.index.map_or(0, to_index),
                count: diff.count.map_or(0, to_index),
            }),
            dto::DiffDto::REPLACE => Ok(Self::Replace {
                index: diff.index.map_or(0, to_index),
                text,
            }),
            other => Err(ConversionError::UnknownDiffType(other.to_string())),
        }
    }
}

impl TryFrom<dto::UserDto> for RosterMember {
    type Error = ConversionError;

    fn try_from(user: dto::UserDto) -> Result<Self, Self::Error> {
        let identity = user.id.ok_or(ConversionError::MissingIdentity)?;
        Ok(Self {
            identity,
            display_name: user.username.unwrap_or_else(|| ANONYMOUS.to_string()),
        })
    }
}

impl dto::RoomJoinedPayload {
    /// Split the confirmation into roster members and their current texts.
    ///
    /// Users without a usable id are skipped, so the snapshot can hold
    /// fewer members than `users`.
    pub fn into_snapshot(self) -> (Vec<RosterMember>, HashMap<Identity, String>) {
        let listed = self.users.len();
        let members: Vec<RosterMember> = self
            .users
            .into_iter()
            .filter_map(|user| match RosterMember::try_from(user) {
                Ok(member) => Some(member),
                Err(e) => {
                    tracing::debug!("Skipping room member: {}", e);
                    None
                }
            })
            .collect();
        if members.len() < listed {
            tracing::info!(
                "Skipped {} of {} room members without an id",
                listed - members.len(),
                listed
            );
        }

        let texts = self
            .current_messages
            .into_iter()
            .filter_map(|(id, text)| match text {
                serde_json::Value::String(text) => Some((Identity::new(id), text)),
                _ => None,
            })
            .collect();

        (members, texts)
    }
}
