//! Shared utilities for the Jumble Clanker packages.

pub mod logger;
pub mod signal;
pub mod time;
