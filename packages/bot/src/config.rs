//! Runtime settings of a bot session.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{DEFAULT_CORPUS_CAPACITY, jumble};
use crate::session::JoinRequest;

pub const DEFAULT_ROOM_ID: &str = "734117";
pub const DEFAULT_USERNAME: &str = "Jumble Clanker";
pub const DEFAULT_LOCATION: &str = "Clanker Jungle, Clanker";
pub const DEFAULT_HOSTS: [&str; 2] = ["https://classic.talkomatic.co", "https://dev.talkomatic.co"];
pub const DEFAULT_GREETING: &str = "Hello from Jumble Clanker!";
pub const DEFAULT_REPLY_PROBABILITY: f64 = 0.6;
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(28);
pub const DEFAULT_TYPING_JITTER: Duration = Duration::from_millis(40);
pub const DEFAULT_JOIN_RETRY_INTERVAL: Duration = Duration::from_millis(1500);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("At least one host is required")]
    EmptyHosts,

    #[error("At least one join request shape is required")]
    NoJoinRequests,

    #[error("Reply probability must be within 0.0..=1.0, got {0}")]
    InvalidProbability(f64),
}

/// Everything a [`SessionController`](crate::session::SessionController) needs
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room_id: String,
    pub username: String,
    pub location: String,
    pub guest_id: String,
    /// Candidate hosts, tried in order
    pub hosts: Vec<String>,
    /// Join request shapes, tried in order on each connection
    pub join_requests: Vec<JoinRequest>,
    pub join_retry_interval: Duration,
    pub corpus_capacity: usize,
    pub jumble_word_count: usize,
    pub reply_probability: f64,
    pub typing_base_delay: Duration,
    pub typing_jitter: Duration,
    pub greeting: String,
    pub connect_timeout: Duration,
    /// Attempts to get back into the room on the same host after a joined
    /// connection drops
    pub reconnect_attempts: u32,
    /// First reconnect backoff, doubled per attempt
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_room(DEFAULT_ROOM_ID)
    }
}

impl SessionConfig {
    /// Defaults targeting `room_id`, with the standard join request shapes
    pub fn for_room(room_id: impl Into<String>) -> Self {
        let room_id = room_id.into();
        Self {
            join_requests: JoinRequest::default_shapes(&room_id),
            room_id,
            username: DEFAULT_USERNAME.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            guest_id: String::new(),
            hosts: DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
            join_retry_interval: DEFAULT_JOIN_RETRY_INTERVAL,
            corpus_capacity: DEFAULT_CORPUS_CAPACITY,
            jumble_word_count: jumble::DEFAULT_WORD_COUNT,
            reply_probability: DEFAULT_REPLY_PROBABILITY,
            typing_base_delay: DEFAULT_TYPING_DELAY,
            typing_jitter: DEFAULT_TYPING_JITTER,
            greeting: DEFAULT_GREETING.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_delay: DEFAULT_MAX_RECONNECT_DELAY,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.is_empty() {
            return Err(ConfigError::EmptyHosts);
        }
        if self.join_requests.is_empty() {
            return Err(ConfigError::NoJoinRequests);
        }
        if !(0.0..=1.0).contains(&self.reply_probability) {
            return Err(ConfigError::InvalidProbability(self.reply_probability));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        // テスト項目: デフォルト設定は検証を通り、既定のルーム向けの参加形式を持つ
        // given (前提条件):
        let config = SessionConfig::default();

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Ok(()));
        assert_eq!(config.room_id, DEFAULT_ROOM_ID);
        assert_eq!(config.join_requests.len(), 5);
        assert_eq!(config.hosts.len(), 2);
    }

    #[test]
    fn test_empty_hosts_are_rejected() {
        // テスト項目: 接続先ホストが空の場合はエラーになる
        // given (前提条件):
        let config = SessionConfig {
            hosts: Vec::new(),
            ..SessionConfig::default()
        };

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Err(ConfigError::EmptyHosts));
    }

    #[test]
    fn test_empty_join_requests_are_rejected() {
        // テスト項目: 参加リクエストの形式が空の場合はエラーになる
        // given (前提条件):
        let config = SessionConfig {
            join_requests: Vec::new(),
            ..SessionConfig::default()
        };

        // when (操作):
        let result = config.validate();

        // then (期待する結果):
        assert_eq!(result, Err(ConfigError::NoJoinRequests));
    }

    #[test]
    fn test_out_of_range_probability_is_rejected() {
        // テスト項目: 返信確率が 0.0〜1.0 の範囲外ならエラーになる
        // given (前提条件):
        let too_high = SessionConfig {
            reply_probability: 1.5,
            ..SessionConfig::default()
        };
        let not_a_number = SessionConfig {
            reply_probability: f64::NAN,
            ..SessionConfig::default()
        };

        // when (操作):
        let too_high = too_high.validate();
        let not_a_number = not_a_number.validate();

        // then (期待する結果):
        assert_eq!(too_high, Err(ConfigError::InvalidProbability(1.5)));
        assert!(matches!(not_a_number, Err(ConfigError::InvalidProbability(_))));
    }
}
