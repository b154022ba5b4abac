//! Per-user text buffer transformations.
//!
//! Indices and counts are measured in `char`s of the current text and are
//! clamped to the text bounds, so malformed operations degrade to a
//! best-effort result instead of failing.

/// Incremental description of how a participant's draft text changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Replace the whole text
    FullReplace(String),
    /// Insert `text` before the char at `index`
    Insert { index: usize, text: String },
    /// Remove `count` chars starting at `index`
    Delete { index: usize, count: usize },
    /// Overwrite starting at `index`.
    ///
    /// The removed span is `text.len() + 1` chars, one longer than the
    /// inserted text. The room service uses this convention on the wire;
    /// keep it as is even though it does not mirror `Insert`.
    Replace { index: usize, text: String },
}

impl EditOperation {
    /// Apply the operation to `current` and return the new text.
    pub fn apply(&self, current: &str) -> String {
        match self {
            Self::FullReplace(text) => text.clone(),
            Self::Insert { index, text } => {
                let at = byte_offset(current, *index);
                let mut result = String::with_capacity(current.len() + text.len());
                result.push_str(&current[..at]);
                result.push_str(text);
                result.push_str(&current[at..]);
                result
            }
            Self::Delete { index, count } => {
                let len = current.chars().count();
                let start = (*index).min(len);
                let end = start.saturating_add(*count).min(len);
                splice(current, start, end, "")
            }
            Self::Replace { index, text } => {
                let len = current.chars().count();
                let start = (*index).min(len);
                let end = start
                    .saturating_add(text.chars().count())
                    .saturating_add(1)
                    .min(len);
                splice(current, start, end, text)
            }
        }
    }
}

/// Byte offset of the char at `char_index`, or the end of `s` when past it.
fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map_or(s.len(), |(offset, _)| offset)
}

/// Replace the chars in `start..end` with `insert`. Requires `start <= end`.
fn splice(s: &str, start: usize, end: usize, insert: &str) -> String {
    let head = byte_offset(s, start);
    let tail = byte_offset(s, end);
    let mut result = String::with_capacity(s.len() - (tail - head) + insert.len());
    result.push_str(&s[..head]);
    result.push_str(insert);
    result.push_str(&s[tail..]);
    result
}
