//! Character-by-character typing simulation.

use std::time::Duration;

use rand::Rng;

use crate::infrastructure::dto::socketio::{EditUpdate, events};
use crate::infrastructure::transport::Outbound;

/// Paces a text out as a sequence of growing-prefix full replacements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingScheduler {
    base_delay: Duration,
    jitter: Duration,
}

impl TypingScheduler {
    pub fn new(base_delay: Duration, jitter: Duration) -> Self {
        Self { base_delay, jitter }
    }

    /// Pause after one keystroke: `base_delay` plus a whole number of
    /// milliseconds drawn from `0..jitter`
    pub fn pause<R>(&self, rng: &mut R) -> Duration
    where
        R: Rng + ?Sized,
    {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.base_delay;
        }
        self.base_delay + Duration::from_millis(rng.gen_range(0..jitter_ms))
    }

    /// Send every prefix of `text`, one char longer each time, pausing after
    /// each. Sends are best-effort; a dropped connection just ends up
    /// swallowing the remaining prefixes.
    pub async fn emit<R>(&self, outbound: &Outbound, text: &str, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for prefix in prefixes(text) {
            outbound.emit(events::CHAT_UPDATE, &EditUpdate::full_replace(prefix));
            tokio::time::sleep(self.pause(rng)).await;
        }
    }
}

/// `text[..1]`, `text[..2]`, … `text` counted in chars
fn prefixes(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .map(move |(offset, c)| &text[..offset + c.len_utf8()])
}
