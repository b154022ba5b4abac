//! Data Transfer Objects (DTOs) for the room service protocol.
//!
//! - `socketio`: event names and payload shapes exchanged over Socket.IO
//! - `conversion`: DTO → domain conversions

pub mod conversion;
pub mod socketio;
