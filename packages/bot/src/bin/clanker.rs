//! Jumble Clanker bot with an HTTP liveness endpoint.
//!
//! Joins a Talkomatic room, mirrors what everyone is typing and now and then
//! types back a jumble of recent messages.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin clanker
//! ROOM_ID=123456 cargo run --bin clanker -- --host https://classic.talkomatic.co
//! ```

use std::{path::PathBuf, time::Duration};

use clanker::{
    SessionConfig, SessionController, SocketIoConnector,
    config::{self, DEFAULT_HOSTS},
    infrastructure::guest_id,
};
use clanker_keepalive::KeepaliveServer;
use clanker_shared::{
    logger::setup_logger,
    signal::shutdown_signal,
    time::{timestamp_to_rfc3339, unix_millis},
};
use clap::Parser;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "clanker")]
#[command(about = "Talkomatic bot that types back jumbled recent messages", long_about = None)]
struct Args {
    /// Room to join
    #[arg(long, env = "ROOM_ID", default_value = config::DEFAULT_ROOM_ID)]
    room_id: String,

    /// Display name in the room
    #[arg(long, env = "USERNAME", default_value = config::DEFAULT_USERNAME)]
    username: String,

    /// Location shown in the lobby
    #[arg(long, env = "LOCATION", default_value = config::DEFAULT_LOCATION)]
    location: String,

    /// Room service hosts, tried in order (comma-separated in HOSTS)
    #[arg(long = "host", env = "HOSTS", value_delimiter = ',', default_values = DEFAULT_HOSTS)]
    hosts: Vec<String>,

    /// Guest id to use instead of the one stored in the guest file
    #[arg(long, env = "GUEST_ID")]
    guest_id: Option<String>,

    /// File the guest id is read from, or generated into
    #[arg(long, env = "GUEST_FILE", default_value = guest_id::DEFAULT_GUEST_FILE)]
    guest_file: PathBuf,

    /// Address for the liveness endpoint
    #[arg(long, env = "BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Port for the liveness endpoint
    #[arg(short = 'p', long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Chance of answering a finalized message
    #[arg(long, default_value_t = config::DEFAULT_REPLY_PROBABILITY)]
    reply_probability: f64,

    /// Base pause between typed characters
    #[arg(long, default_value = "28")]
    typing_delay_ms: u64,

    /// Random extra pause between typed characters, at most this much
    #[arg(long, default_value = "40")]
    typing_jitter_ms: u64,

    /// Wait before trying the next join request shape
    #[arg(long, default_value = "1500")]
    join_retry_ms: u64,

    /// Number of recent messages kept as jumble material
    #[arg(long, default_value = "200")]
    corpus_size: usize,

    /// Words per jumbled reply
    #[arg(long, default_value = "24")]
    jumble_words: usize,

    /// Timeout for the WebSocket connect and handshake
    #[arg(long, default_value = "10000")]
    connect_timeout_ms: u64,

    /// Attempts to get back into the room on the same host after a drop
    #[arg(long, default_value_t = config::DEFAULT_RECONNECT_ATTEMPTS)]
    reconnect_attempts: u32,

    /// First wait before reconnecting, doubled per attempt
    #[arg(long, default_value = "1000")]
    reconnect_delay_ms: u64,

    /// Longest wait between reconnect attempts
    #[arg(long, default_value = "5000")]
    max_reconnect_delay_ms: u64,
}

impl Args {
    fn guest_id(&self) -> String {
        self.guest_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| guest_id::load_or_create(&self.guest_file))
    }

    fn session_config(&self, guest_id: String) -> SessionConfig {
        SessionConfig {
            username: self.username.clone(),
            location: self.location.clone(),
            guest_id,
            hosts: self
                .hosts
                .iter()
                .map(|host| host.trim())
                .filter(|host| !host.is_empty())
                .map(str::to_string)
                .collect(),
            join_retry_interval: Duration::from_millis(self.join_retry_ms),
            corpus_capacity: self.corpus_size,
            jumble_word_count: self.jumble_words,
            reply_probability: self.reply_probability,
            typing_base_delay: Duration::from_millis(self.typing_delay_ms),
            typing_jitter: Duration::from_millis(self.typing_jitter_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            reconnect_attempts: self.reconnect_attempts,
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_reconnect_delay: Duration::from_millis(self.max_reconnect_delay_ms),
            ..SessionConfig::for_room(self.room_id.trim())
        }
    }
}

/// Resolves once the shutdown flag is raised (or its sender is gone)
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let config = args.session_config(args.guest_id());
    tracing::info!(
        "[boot] {} ROOM_ID={}, USERNAME={}, LOCATION={}, guestId={}",
        timestamp_to_rfc3339(unix_millis()),
        config.room_id,
        config.username,
        config.location,
        config.guest_id
    );

    let connector = SocketIoConnector::new(config.guest_id.clone(), config.connect_timeout);
    let mut controller = match SessionController::new(connector, config) {
        Ok(controller) => controller,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let keepalive = match KeepaliveServer::bind(&args.bind, args.port).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Liveness server error: {}", e);
            std::process::exit(1);
        }
    };
    let keepalive_task = tokio::spawn(keepalive.run(wait_for_shutdown(shutdown_rx.clone())));

    let result = {
        let bot = controller.run(wait_for_shutdown(shutdown_rx));
        tokio::pin!(bot);
        tokio::select! {
            result = &mut bot => result,
            _ = shutdown_signal() => {
                let _ = shutdown_tx.send(true);
                bot.await
            }
        }
    };

    // stop the liveness endpoint too when the bot gave up on its own
    let _ = shutdown_tx.send(true);
    match keepalive_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Liveness server error: {}", e),
        Err(e) => tracing::warn!("Liveness server task failed: {}", e),
    }

    if let Err(e) = result {
        tracing::error!("Bot stopped: {}", e);
        std::process::exit(1);
    }
}
