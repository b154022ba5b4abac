//! Participant identity value object.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Number of identity characters used for a placeholder display name.
const PLACEHOLDER_PREFIX_CHARS: usize = 4;

/// Stable participant identifier assigned by the room service.
///
/// The service sends identities either as JSON strings or JSON numbers;
/// both are normalised to their textual form so `42` and `"42"` compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create a new identity from its textual form
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Interpret a raw JSON value as an identity.
    ///
    /// Returns `None` for anything that is not a non-empty string or a number.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Field deserializer for optional identities in inbound payloads.
    ///
    /// Anything [`Identity::from_json`] rejects, including `""`, becomes
    /// `None` instead of failing the whole payload.
    pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(Self::from_json))
    }

    /// Get the identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identity and return the inner string
    pub fn into_string(self) -> String {
        self.0
    }

    /// Display name used when an identity shows up before its join event.
    pub fn placeholder_name(&self) -> String {
        let prefix: String = self.0.chars().take(PLACEHOLDER_PREFIX_CHARS).collect();
        format!("User-{}", prefix)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawIdentity {
            Text(String),
            Number(serde_json::Number),
        }

        match RawIdentity::deserialize(deserializer)? {
            RawIdentity::Text(s) if s.is_empty() => {
                Err(serde::de::Error::custom("identity must not be empty"))
            }
            RawIdentity::Text(s) => Ok(Self(s)),
            RawIdentity::Number(n) => Ok(Self(n.to_string())),
        }
    }
}
