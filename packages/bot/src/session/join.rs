//! Room join negotiation.
//!
//! The service accepts one of several join request shapes and nobody knows
//! which up front. [`JoinNegotiator`] sends them one at a time, advancing
//! whenever the retry interval passes without a confirmation.

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use crate::infrastructure::dto::socketio::events;

/// One way of asking to join the room
#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    pub event: String,
    pub payload: serde_json::Value,
}

impl JoinRequest {
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Shapes the known service variants accept, most common first
    pub fn default_shapes(room_id: &str) -> Vec<Self> {
        let numeric_or_text = if !room_id.is_empty() && room_id.bytes().all(|b| b.is_ascii_digit())
        {
            room_id
                .parse::<u64>()
                .map_or_else(|_| json!(room_id), |n| json!(n))
        } else {
            json!(room_id)
        };

        vec![
            Self::new(events::JOIN_ROOM, json!({ "roomId": room_id })),
            Self::new(events::JOIN_ROOM, json!({ "roomId": numeric_or_text })),
            Self::new(events::JOIN_ROOM, json!(room_id)),
            Self::new(events::JOIN_ROOM, json!({ "roomCode": room_id })),
            Self::new(events::JOIN_ROOM_CODE, json!({ "code": room_id })),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    /// Not started on this connection
    Idle,
    /// `attempt` requests sent, waiting for a confirmation
    Pending { attempt: usize },
    Confirmed,
    Exhausted,
}

/// What the caller should do next
#[derive(Debug, Clone, PartialEq)]
pub enum JoinStep {
    /// Send `request`; it is attempt number `attempt` (1-based)
    Send { attempt: usize, request: JoinRequest },
    /// Every shape went unanswered
    Exhausted { attempts: usize },
    /// Nothing to do
    Idle,
}

/// Walks the join request shapes for one connection
#[derive(Debug)]
pub struct JoinNegotiator {
    requests: Vec<JoinRequest>,
    retry_interval: Duration,
    next: usize,
    deadline: Option<Instant>,
    status: JoinStatus,
}

impl JoinNegotiator {
    pub fn new(requests: Vec<JoinRequest>, retry_interval: Duration) -> Self {
        Self {
            requests,
            retry_interval,
            next: 0,
            deadline: None,
            status: JoinStatus::Idle,
        }
    }

    /// Begin negotiating on a fresh connection, returning the first request
    pub fn start(&mut self, now: Instant) -> JoinStep {
        self.next = 0;
        self.status = JoinStatus::Idle;
        self.advance(now)
    }

    /// The retry deadline passed without a confirmation
    pub fn on_deadline(&mut self, now: Instant) -> JoinStep {
        match self.status {
            JoinStatus::Pending { .. } => self.advance(now),
            _ => {
                self.deadline = None;
                JoinStep::Idle
            }
        }
    }

    /// Record a join confirmation.
    ///
    /// Returns `true` only for the first confirmation while a request is
    /// pending; repeats and confirmations after exhaustion are ignored.
    pub fn confirm(&mut self) -> bool {
        match self.status {
            JoinStatus::Pending { .. } => {
                self.status = JoinStatus::Confirmed;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Stop without a result, e.g. when the connection goes away
    pub fn reset(&mut self) {
        self.next = 0;
        self.deadline = None;
        self.status = JoinStatus::Idle;
    }

    /// When the pending request times out
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn status(&self) -> JoinStatus {
        self.status
    }

    /// Requests sent on this connection so far
    pub fn attempts(&self) -> usize {
        self.next
    }

    fn advance(&mut self, now: Instant) -> JoinStep {
        let Some(request) = self.requests.get(self.next).cloned() else {
            self.deadline = None;
            self.status = JoinStatus::Exhausted;
            return JoinStep::Exhausted {
                attempts: self.next,
            };
        };

        self.next += 1;
        self.deadline = Some(now + self.retry_interval);
        self.status = JoinStatus::Pending { attempt: self.next };
        JoinStep::Send {
            attempt: self.next,
            request,
        }
    }
}
