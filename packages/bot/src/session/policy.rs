//! Failover decisions.
//!
//! Pure functions over [`SessionError`] so the controller's retry loop stays
//! easy to follow and the rules stay easy to test.

use std::time::Duration;

use super::SessionError;

/// Decide whether the controller should dial the same host again.
///
/// # Arguments
///
/// * `error` - The error that ended the current connection
/// * `was_joined` - Whether that connection got into the room
/// * `previous` - Reconnect attempts already made since the host was last joined
/// * `max_attempts` - Reconnect budget per lost room
///
/// # Returns
///
/// The number of the next reconnect attempt, or `None` when the host should
/// be dropped in favour of the next one
pub fn next_reconnect_attempt(
    error: &SessionError,
    was_joined: bool,
    previous: u32,
    max_attempts: u32,
) -> Option<u32> {
    let next = match error {
        SessionError::ConnectionLost { .. } if was_joined => 1,
        SessionError::ConnectionLost { .. } | SessionError::Transport { .. } if previous > 0 => {
            previous.saturating_add(1)
        }
        _ => return None,
    };
    (next <= max_attempts).then_some(next)
}

/// Backoff before reconnect attempt `attempt` (1-based): `base` doubled per
/// attempt, capped at `max`.
pub fn reconnect_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}
