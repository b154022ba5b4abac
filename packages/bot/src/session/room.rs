//! Per-room state: the roster mirror, recent messages and our own output.

use std::sync::Arc;

use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};

use crate::config::SessionConfig;
use crate::domain::{EditOperation, Identity, RecentCorpus, Roster, RosterMember, jumble};
use crate::infrastructure::dto::socketio::{ChatUpdatePayload, RoomJoinedPayload, UserDto};
use crate::infrastructure::transport::Outbound;

use super::{OutputSlot, TypingScheduler};

/// Everything the bot knows about the room it joined
pub struct RoomSession {
    config: Arc<SessionConfig>,
    roster: Roster,
    corpus: RecentCorpus,
    output: OutputSlot,
    typing: TypingScheduler,
    reply_probability: f64,
    rng: StdRng,
}

impl RoomSession {
    pub fn new(config: Arc<SessionConfig>) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a session with a caller-provided RNG (deterministic in tests)
    pub fn with_rng(config: Arc<SessionConfig>, rng: StdRng) -> Self {
        Self {
            roster: Roster::new(),
            corpus: RecentCorpus::with_capacity(config.corpus_capacity),
            output: OutputSlot::new(),
            typing: TypingScheduler::new(config.typing_base_delay, config.typing_jitter),
            reply_probability: usable_probability(config.reply_probability),
            rng,
            config,
        }
    }

    /// Join confirmed: load the occupant snapshot and type the greeting
    pub fn on_room_joined(&mut self, payload: RoomJoinedPayload, outbound: &Outbound) {
        let (members, texts) = payload.into_snapshot();
        self.roster.snapshot(members, texts);
        tracing::info!("Room has {} occupants", self.roster.len());

        let greeting = self.config.greeting.clone();
        self.start_typing(greeting, outbound);
    }

    pub fn on_user_joined(&mut self, user: UserDto) {
        match RosterMember::try_from(user) {
            Ok(member) => {
                tracing::info!("{} ({}) joined", member.display_name, member.identity);
                self.roster.on_join(member.identity, member.display_name);
            }
            Err(e) => tracing::debug!("Ignoring user joined: {}", e),
        }
    }

    pub fn on_user_left(&mut self, identity: &Identity) {
        match self.roster.on_leave(identity) {
            Some(entry) => tracing::info!("{} ({}) left", entry.display_name, identity),
            None => tracing::debug!("Unknown user {} left", identity),
        }
    }

    /// Route a `chat update` to the edit path or the finalized-message path
    pub fn on_chat_update(&mut self, payload: ChatUpdatePayload, outbound: &Outbound) {
        let Some(identity) = payload.user_id else {
            tracing::debug!("Ignoring chat update without user id");
            return;
        };

        if let Some(diff) = payload.diff {
            match EditOperation::try_from(diff) {
                Ok(op) => {
                    let entry = self.roster.apply_edit(&identity, &op);
                    tracing::trace!("{} is typing: {:?}", entry.display_name, entry.text);
                }
                Err(e) => tracing::debug!("Ignoring edit from {}: {}", identity, e),
            }
            return;
        }

        match payload.message {
            Some(serde_json::Value::String(message)) => {
                self.on_message(&identity, &message, outbound)
            }
            _ => tracing::debug!("Ignoring chat update from {} with no diff or message", identity),
        }
    }

    fn on_message(&mut self, identity: &Identity, message: &str, outbound: &Outbound) {
        let entry = self.roster.set_text(identity, message);
        tracing::debug!("{} said {:?}", entry.display_name, message);

        if self.corpus.record(message) {
            self.maybe_reply(outbound);
        }
    }

    /// Flip the reply coin and, on success, type out a jumbled phrase.
    ///
    /// Returns whether an output run started.
    pub fn maybe_reply(&mut self, outbound: &Outbound) -> bool {
        if self.output.is_busy() || self.corpus.is_empty() {
            return false;
        }
        if !self.rng.gen_bool(self.reply_probability) {
            return false;
        }

        let pool: Vec<&str> = self.corpus.word_pool().collect();
        let phrase = jumble::generate(&pool, self.config.jumble_word_count, &mut self.rng);
        tracing::info!("Replying with {:?}", phrase);
        self.start_typing(phrase, outbound)
    }

    /// Type `text` out unless an output run is already active
    pub fn start_typing(&mut self, text: String, outbound: &Outbound) -> bool {
        let typing = self.typing;
        let outbound = outbound.clone();
        let mut rng = StdRng::seed_from_u64(self.rng.next_u64());

        let started = self.output.try_spawn(async move {
            typing.emit(&outbound, &text, &mut rng).await;
        });
        if !started {
            tracing::debug!("Output busy; not starting another run");
        }
        started
    }

    /// Forget the occupants of a previous connection; recent messages stay
    pub fn clear_roster(&mut self) {
        self.roster.clear();
    }

    /// Stop any output run in progress
    pub fn abandon_output(&mut self) {
        if self.output.abandon() {
            tracing::debug!("Abandoned output run");
        }
    }

    pub fn is_typing(&self) -> bool {
        self.output.is_busy()
    }

    pub fn config(&self) -> &Arc<SessionConfig> {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn corpus(&self) -> &RecentCorpus {
        &self.corpus
    }
}

/// `gen_bool` panics outside 0.0..=1.0
fn usable_probability(probability: f64) -> f64 {
    if probability.is_nan() {
        tracing::warn!("Reply probability is NaN; never replying");
        return 0.0;
    }
    let clamped = probability.clamp(0.0, 1.0);
    if clamped != probability {
        tracing::warn!("Reply probability {} clamped to {}", probability, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::infrastructure::transport::OutboundMessage;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 参加確認で名簿が初期化され、挨拶が 1 文字ずつ送られること
    // - 未知の ID への編集で仮エントリが作られること
    // - 確定メッセージの記録と、確率・出力中フラグによる返信判定
    // ========================================

    fn session(reply_probability: f64) -> RoomSession {
        let config = SessionConfig {
            reply_probability,
            typing_base_delay: Duration::from_millis(28),
            typing_jitter: Duration::ZERO,
            greeting: "Hi!".to_string(),
            ..SessionConfig::default()
        };
        RoomSession::with_rng(Arc::new(config), StdRng::seed_from_u64(42))
    }

    fn channel() -> (Outbound, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Outbound::new(tx), rx)
    }

    fn sent_texts(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(message) = rx.try_recv() {
            texts.push(message.payload["diff"]["text"].as_str().unwrap_or_default().to_string());
        }
        texts
    }

    fn chat(payload: serde_json::Value) -> ChatUpdatePayload {
        serde_json::from_value(payload).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_joined_loads_roster_and_types_greeting() {
        // テスト項目: 参加確認で名簿が初期化され、挨拶が接頭辞の列として送られる
        // given (前提条件):
        let mut room = session(0.0);
        let (outbound, mut rx) = channel();
        let payload: RoomJoinedPayload = serde_json::from_value(json!({
            "users": [{"id": "a", "username": "Alice"}, {"id": "b"}],
            "currentMessages": {"a": "draft"}
        }))
        .unwrap();

        // when (操作):
        room.on_room_joined(payload, &outbound);
        tokio::time::sleep(Duration::from_secs(1)).await;

        // then (期待する結果):
        assert_eq!(room.roster().len(), 2);
        assert_eq!(room.roster().get(&Identity::new("a")).unwrap().text, "draft");
        assert_eq!(room.roster().get(&Identity::new("b")).unwrap().text, "");
        assert_eq!(sent_texts(&mut rx), vec!["H", "Hi", "Hi!"]);
        assert!(!room.is_typing());
    }

    #[tokio::test]
    async fn test_edit_for_unknown_user_creates_placeholder() {
        // テスト項目: 空の名簿で未知の ID から add を受けると仮エントリが作られる
        // given (前提条件):
        let mut room = session(0.0);
        let (outbound, _rx) = channel();

        // when (操作):
        room.on_chat_update(
            chat(json!({"userId": "u1", "diff": {"type": "add", "index": 0, "text": "hi"}})),
            &outbound,
        );

        // then (期待する結果):
        let entry = room.roster().get(&Identity::new("u1")).unwrap();
        assert_eq!(entry.text, "hi");
        assert_eq!(entry.display_name, "User-u1");
    }

    #[tokio::test]
    async fn test_edits_apply_in_arrival_order() {
        // テスト項目: 同じユーザーへの編集は届いた順に適用される
        // given (前提条件):
        let mut room = session(0.0);
        let (outbound, _rx) = channel();
        room.on_user_joined(UserDto {
            id: Some(Identity::new("u1")),
            username: Some("Ann".to_string()),
        });

        // when (操作):
        for diff in [
            json!({"type": "add", "text": "helo"}),
            json!({"type": "add", "index": 3, "text": "l"}),
            json!({"type": "delete", "index": 0, "count": 1}),
            json!({"type": "rotate"}),
        ] {
            room.on_chat_update(chat(json!({"userId": "u1", "diff": diff})), &outbound);
        }

        // then (期待する結果):
        let entry = room.roster().get(&Identity::new("u1")).unwrap();
        assert_eq!(entry.display_name, "Ann");
        assert_eq!(entry.text, "ello");
    }

    #[tokio::test]
    async fn test_chat_update_without_user_is_ignored() {
        // テスト項目: userId の無い chat update は無視される
        // given (前提条件):
        let mut room = session(1.0);
        let (outbound, _rx) = channel();

        // when (操作):
        room.on_chat_update(chat(json!({"message": "hello there"})), &outbound);

        // then (期待する結果):
        assert!(room.roster().is_empty());
        assert!(room.corpus().is_empty());
        assert!(!room.is_typing());
    }

    #[tokio::test]
    async fn test_chat_update_with_empty_user_id_is_ignored() {
        // テスト項目: userId が空文字の chat update は仮エントリを作らずに無視される
        // given (前提条件):
        let mut room = session(1.0);
        let (outbound, _rx) = channel();

        // when (操作):
        room.on_chat_update(
            chat(json!({"userId": "", "diff": {"type": "add", "text": "ghost"}})),
            &outbound,
        );
        room.on_chat_update(chat(json!({"userId": "", "message": "boo"})), &outbound);

        // then (期待する結果):
        assert!(room.roster().is_empty());
        assert!(room.corpus().is_empty());
        assert!(!room.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalized_message_is_recorded_and_answered() {
        // テスト項目: 確定メッセージで送信者のテキストが更新され、記録と返信が行われる
        // given (前提条件):
        let mut room = session(1.0);
        let (outbound, mut rx) = channel();

        // when (操作):
        room.on_chat_update(
            chat(json!({"userId": 9, "message": "  banana split  "})),
            &outbound,
        );
        let typing = room.is_typing();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // then (期待する結果):
        let entry = room.roster().get(&Identity::new("9")).unwrap();
        assert_eq!(entry.text, "  banana split  ");
        assert_eq!(room.corpus().iter().collect::<Vec<_>>(), vec!["banana split"]);
        assert!(typing);
        let texts = sent_texts(&mut rx);
        let phrase = texts.last().unwrap();
        assert_eq!(phrase.split(' ').count(), 24);
        assert_eq!(texts.len(), phrase.chars().count());
    }

    #[tokio::test]
    async fn test_blank_message_is_not_recorded() {
        // テスト項目: 空白だけの確定メッセージはテキストだけ更新され、記録も返信もされない
        // given (前提条件):
        let mut room = session(1.0);
        let (outbound, _rx) = channel();

        // when (操作):
        room.on_chat_update(chat(json!({"userId": "u1", "message": "   "})), &outbound);

        // then (期待する結果):
        assert_eq!(room.roster().get(&Identity::new("u1")).unwrap().text, "   ");
        assert!(room.corpus().is_empty());
        assert!(!room.is_typing());
    }

    #[tokio::test]
    async fn test_zero_probability_never_replies() {
        // テスト項目: 返信確率 0 の場合は記録だけして返信しない
        // given (前提条件):
        let mut room = session(0.0);
        let (outbound, _rx) = channel();

        // when (操作):
        for i in 0..20 {
            room.on_chat_update(
                chat(json!({"userId": "u1", "message": format!("message {i}")})),
                &outbound,
            );
        }

        // then (期待する結果):
        assert_eq!(room.corpus().len(), 20);
        assert!(!room.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_second_reply_while_typing() {
        // テスト項目: 出力中は新しいメッセージが来ても返信を重ねない
        // given (前提条件):
        let mut room = session(1.0);
        let (outbound, _rx) = channel();
        room.on_chat_update(chat(json!({"userId": "u1", "message": "first words"})), &outbound);

        // when (操作):
        let replied = room.maybe_reply(&outbound);
        room.on_chat_update(chat(json!({"userId": "u2", "message": "second words"})), &outbound);

        // then (期待する結果):
        assert!(!replied);
        assert!(room.is_typing());
        assert_eq!(room.corpus().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_output_stops_typing() {
        // テスト項目: abandon_output で出力が止まり、以降の接頭辞は送られない
        // given (前提条件):
        let mut room = session(0.0);
        let (outbound, mut rx) = channel();
        room.start_typing("a long greeting".to_string(), &outbound);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // when (操作):
        room.abandon_output();
        let before = sent_texts(&mut rx).len();
        tokio::time::sleep(Duration::from_secs(5)).await;

        // then (期待する結果):
        assert!(before < "a long greeting".len());
        assert!(sent_texts(&mut rx).is_empty());
        assert!(!room.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_probability_does_not_panic() {
        // テスト項目: 範囲外の返信確率は 0.0〜1.0 に丸められ、NaN は返信しない扱いになる
        // given (前提条件):
        let mut always = session(1.5);
        let mut never = session(f64::NAN);
        let mut below = session(-0.5);
        let (outbound, _rx) = channel();

        // when (操作):
        for room in [&mut always, &mut never, &mut below] {
            room.on_chat_update(chat(json!({"userId": "u1", "message": "some words"})), &outbound);
        }

        // then (期待する結果):
        assert!(always.is_typing());
        assert!(!never.is_typing());
        assert!(!below.is_typing());
    }

    #[tokio::test]
    async fn test_clear_roster_keeps_recent_messages() {
        // テスト項目: 名簿を消しても記録済みのメッセージは残る
        // given (前提条件):
        let mut room = session(0.0);
        let (outbound, _rx) = channel();
        room.on_chat_update(chat(json!({"userId": "u1", "message": "kept words"})), &outbound);

        // when (操作):
        room.clear_roster();

        // then (期待する結果):
        assert!(room.roster().is_empty());
        assert_eq!(room.corpus().len(), 1);
    }

    #[tokio::test]
    async fn test_user_left_removes_entry() {
        // テスト項目: user left で名簿から削除され、未知の ID は無視される
        // given (前提条件):
        let mut room = session(0.0);
        room.on_user_joined(UserDto {
            id: Some(Identity::new("a")),
            username: None,
        });

        // when (操作):
        room.on_user_left(&Identity::new("a"));
        room.on_user_left(&Identity::new("nobody"));

        // then (期待する結果):
        assert!(room.roster().is_empty());
    }
}
