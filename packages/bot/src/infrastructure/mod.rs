//! Infrastructure layer: wire formats, the room transport and local files.

pub mod dto;
pub mod guest_id;
pub mod transport;
