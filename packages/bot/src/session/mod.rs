//! Room session: connection lifecycle, join negotiation and reactive output.
//!
//! ## 概要
//!
//! - `SessionController`: ホスト一覧を順に試し、接続ごとに参加交渉を行い、
//!   受信イベントを `RoomSession` に振り分ける
//! - `JoinNegotiator`: 参加リクエストの形式を 1 つずつ、確認が来るまで送る
//! - `RoomSession`: 名簿・最近のメッセージ・自分の出力を持つ
//! - `TypingScheduler` / `OutputSlot`: 1 文字ずつの出力と、その多重起動の防止

mod controller;
mod error;
mod join;
pub mod policy;
mod room;
mod slot;
mod state;
mod typing;

pub use controller::SessionController;
pub use error::SessionError;
pub use join::{JoinNegotiator, JoinRequest, JoinStatus, JoinStep};
pub use room::RoomSession;
pub use slot::OutputSlot;
pub use state::SessionState;
pub use typing::TypingScheduler;
