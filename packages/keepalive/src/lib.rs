//! HTTP liveness endpoint for Jumble Clanker.
//!
//! Hosting platforms that put idle processes to sleep poll this endpoint;
//! it carries no bot state.

mod error;
mod handler;
mod server;

pub use error::KeepaliveError;
pub use server::KeepaliveServer;
