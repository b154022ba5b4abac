//! Mirror of the room's occupants and their in-progress text.

use std::collections::HashMap;

use super::{EditOperation, Identity};

/// One occupant believed to be present in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub identity: Identity,
    pub display_name: String,
    pub text: String,
}

/// Identity and display name as announced by the room service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    pub identity: Identity,
    pub display_name: String,
}

/// Identity → occupant mapping.
///
/// An edit for an unknown identity creates a placeholder entry instead of
/// being dropped, because the service does not order leave/join/edit
/// events reliably.
#[derive(Debug, Default)]
pub struct Roster {
    entries: HashMap<Identity, UserEntry>,
}

impl Roster {
    /// Create an empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole roster with a join confirmation snapshot.
    ///
    /// Members without an entry in `text_by_identity` start with empty text.
    pub fn snapshot(
        &mut self,
        users: Vec<RosterMember>,
        mut text_by_identity: HashMap<Identity, String>,
    ) {
        self.entries.clear();
        for member in users {
            let text = text_by_identity
                .remove(&member.identity)
                .unwrap_or_default();
            self.entries.insert(
                member.identity.clone(),
                UserEntry {
                    identity: member.identity,
                    display_name: member.display_name,
                    text,
                },
            );
        }
    }

    /// Forget every occupant
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert or overwrite an occupant with empty text
    pub fn on_join(&mut self, identity: Identity, display_name: String) {
        self.entries.insert(
            identity.clone(),
            UserEntry {
                identity,
                display_name,
                text: String::new(),
            },
        );
    }

    /// Remove an occupant; unknown identities are ignored
    pub fn on_leave(&mut self, identity: &Identity) -> Option<UserEntry> {
        self.entries.remove(identity)
    }

    /// Apply an edit to an occupant's text, creating a placeholder if needed
    pub fn apply_edit(&mut self, identity: &Identity, op: &EditOperation) -> &UserEntry {
        let entry = self
            .entries
            .entry(identity.clone())
            .or_insert_with(|| UserEntry {
                identity: identity.clone(),
                display_name: identity.placeholder_name(),
                text: String::new(),
            });
        entry.text = op.apply(&entry.text);
        entry
    }

    /// Overwrite an occupant's text with a finalized message
    pub fn set_text(&mut self, identity: &Identity, text: &str) -> &UserEntry {
        self.apply_edit(identity, &EditOperation::FullReplace(text.to_string()))
    }

    pub fn get(&self, identity: &Identity) -> Option<&UserEntry> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserEntry> {
        self.entries.values()
    }
}
