//! Domain model of the room mirror.
//!
//! Everything in this module is pure and synchronous: no I/O, no clock.
//! Randomness is injected by the caller.

mod corpus;
mod identity;
pub mod jumble;
mod roster;
mod text_model;

pub use corpus::{DEFAULT_CORPUS_CAPACITY, RecentCorpus};
pub use identity::Identity;
pub use roster::{Roster, RosterMember, UserEntry};
pub use text_model::EditOperation;
