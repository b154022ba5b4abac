//! Bounded history of finalized messages.

use std::collections::VecDeque;

/// Default number of messages kept.
pub const DEFAULT_CORPUS_CAPACITY: usize = 200;

/// Most recent finalized messages, oldest first.
#[derive(Debug)]
pub struct RecentCorpus {
    messages: VecDeque<String>,
    capacity: usize,
}

impl Default for RecentCorpus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CORPUS_CAPACITY)
    }
}

impl RecentCorpus {
    /// Create a corpus keeping at most `capacity` messages
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a finalized message.
    ///
    /// Blank messages are ignored. Returns `true` if the message was stored.
    pub fn record(&mut self, message: &str) -> bool {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return false;
        }

        self.messages.push_back(trimmed.to_string());
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        true
    }

    /// All whitespace-delimited words, oldest message first
    pub fn word_pool(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().flat_map(|m| m.split_whitespace())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }
}
