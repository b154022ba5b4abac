//! Socket.IO client over a raw WebSocket (Engine.IO v4).
//!
//! The connection is split into a reader task that decodes inbound packets
//! into [`ConnectionEvent`]s and answers pings, and a writer task that
//! encodes queued [`OutboundMessage`]s.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderValue, header::USER_AGENT},
        protocol::Message,
    },
};

use super::{
    Connection, ConnectionEvent, Connector, Outbound, OutboundMessage, TransportError,
    packet::{
        EnginePacket, OpenInfo, PONG, SOCKET_DISCONNECT, SocketPacket, connect_error_reason,
        encode_connect, encode_event,
    },
};

const USER_AGENT_VALUE: &str = "JumbleClanker/1.0";
const GUEST_ID_HEADER: &str = "x-guest-id";
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Build the Engine.IO WebSocket endpoint for a room service host.
///
/// `https://host` becomes `wss://host/socket.io/?EIO=4&transport=websocket`.
pub fn endpoint_url(host: &str) -> Result<String, TransportError> {
    let trimmed = host.trim().trim_end_matches('/');
    let invalid = || TransportError::InvalidUrl(host.to_string());

    let (scheme, authority) = trimmed.split_once("://").ok_or_else(invalid)?;
    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        _ => return Err(invalid()),
    };
    if authority.is_empty() {
        return Err(invalid());
    }

    Ok(format!(
        "{}://{}/socket.io/?EIO=4&transport=websocket",
        ws_scheme, authority
    ))
}

/// Connects to room service hosts as a Socket.IO client
pub struct SocketIoConnector {
    guest_id: String,
    connect_timeout: Duration,
}

impl SocketIoConnector {
    /// Create a connector authenticating as `guest_id`
    pub fn new(guest_id: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            guest_id: guest_id.into(),
            connect_timeout,
        }
    }

    fn auth(&self) -> serde_json::Value {
        serde_json::json!({
            "guestId": self.guest_id,
            "fingerprint": self.guest_id,
        })
    }
}

#[async_trait]
impl Connector for SocketIoConnector {
    async fn connect(&self, host: &str) -> Result<Box<dyn Connection>, TransportError> {
        let url = endpoint_url(host)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;
        let guest_header = HeaderValue::from_str(&self.guest_id)
            .map_err(|e| TransportError::Connect(format!("invalid guest id header: {}", e)))?;
        let headers = request.headers_mut();
        headers.insert(GUEST_ID_HEADER, guest_header);
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        let open = tokio::time::timeout(self.connect_timeout, await_open(&mut read))
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))??;
        tracing::debug!(
            "Engine.IO session {} opened (ping interval {}ms)",
            open.sid,
            open.ping_interval
        );

        write
            .send(Message::Text(encode_connect(&self.auth()).into()))
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        Ok(Box::new(SocketIoConnection::spawn(write, read, &open)))
    }
}

/// Wait for the Engine.IO OPEN packet that starts every session
async fn await_open(read: &mut WsRead) -> Result<OpenInfo, TransportError> {
    while let Some(message) = read.next().await {
        match message.map_err(|e| TransportError::Handshake(e.to_string()))? {
            Message::Text(text) => {
                return match EnginePacket::decode(text.as_str()) {
                    Ok(EnginePacket::Open(info)) => Ok(info),
                    Ok(other) => Err(TransportError::Handshake(format!(
                        "expected OPEN packet, got {:?}",
                        other
                    ))),
                    Err(e) => Err(TransportError::Handshake(e.to_string())),
                };
            }
            Message::Close(_) => {
                return Err(TransportError::Handshake(
                    "closed during handshake".to_string(),
                ));
            }
            _ => {}
        }
    }
    Err(TransportError::Handshake(
        "stream ended during handshake".to_string(),
    ))
}

/// Commands for the writer task besides queued events
#[derive(Debug)]
enum WriterCommand {
    Raw(String),
    Close,
}

/// Live Socket.IO connection
pub struct SocketIoConnection {
    outbound: Outbound,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    control: mpsc::UnboundedSender<WriterCommand>,
    reader: JoinHandle<()>,
    writer: Option<JoinHandle<()>>,
}

impl SocketIoConnection {
    fn spawn(write: WsWrite, read: WsRead, open: &OpenInfo) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // the server pings every `ping_interval`; silence beyond that plus
        // the grace period means the link is dead
        let liveness = Duration::from_millis(open.ping_interval.saturating_add(open.ping_timeout));

        let reader = tokio::spawn(read_loop(read, events_tx, control_tx.clone(), liveness));
        let writer = tokio::spawn(write_loop(write, outbound_rx, control_rx));

        Self {
            outbound: Outbound::new(outbound_tx),
            events: events_rx,
            control: control_tx,
            reader,
            writer: Some(writer),
        }
    }
}

#[async_trait]
impl Connection for SocketIoConnection {
    fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) {
        let _ = self.control.send(WriterCommand::Close);
        if let Some(mut writer) = self.writer.take()
            && tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut writer)
                .await
                .is_err()
        {
            tracing::debug!("Timed out flushing outbound packets; dropping them");
            writer.abort();
        }
        self.reader.abort();
    }
}

impl Drop for SocketIoConnection {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(writer) = &self.writer {
            writer.abort();
        }
    }
}

async fn read_loop(
    mut read: WsRead,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    control: mpsc::UnboundedSender<WriterCommand>,
    liveness: Duration,
) {
    loop {
        let message = match tokio::time::timeout(liveness, read.next()).await {
            Err(_) => {
                tracing::warn!("No traffic from server within {:?}", liveness);
                break;
            }
            Ok(None) => {
                tracing::debug!("WebSocket stream ended");
                break;
            }
            Ok(Some(Err(e))) => {
                tracing::warn!("WebSocket read error: {}", e);
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                if !dispatch_engine(text.as_str(), &events, &control) {
                    break;
                }
            }
            Message::Close(_) => {
                tracing::info!("Server closed the connection");
                break;
            }
            _ => {}
        }
    }
}

/// Handle one Engine.IO packet. Returns `false` when the session is over.
fn dispatch_engine(
    text: &str,
    events: &mpsc::UnboundedSender<ConnectionEvent>,
    control: &mpsc::UnboundedSender<WriterCommand>,
) -> bool {
    match EnginePacket::decode(text) {
        Ok(EnginePacket::Ping(data)) => control
            .send(WriterCommand::Raw(format!("{}{}", PONG, data)))
            .is_ok(),
        Ok(EnginePacket::Message(body)) => dispatch_socket(&body, events),
        Ok(EnginePacket::Close) => {
            tracing::info!("Server closed the Engine.IO session");
            false
        }
        Ok(_) => true,
        Err(e) => {
            tracing::debug!("Ignoring undecodable packet {:?}: {}", text, e);
            true
        }
    }
}

/// Handle one Socket.IO packet. Returns `false` when the session is over.
fn dispatch_socket(body: &str, events: &mpsc::UnboundedSender<ConnectionEvent>) -> bool {
    let event = match SocketPacket::decode(body) {
        Ok(SocketPacket::Connect(_)) => ConnectionEvent::Connected,
        Ok(SocketPacket::ConnectError(data)) => {
            ConnectionEvent::ConnectError(connect_error_reason(&data))
        }
        Ok(SocketPacket::Disconnect) => {
            tracing::info!("Server disconnected the socket");
            return false;
        }
        Ok(SocketPacket::Event { name, payload }) => {
            match ConnectionEvent::from_socket_event(&name, payload) {
                Some(event) => event,
                None => return true,
            }
        }
        Ok(SocketPacket::Other(kind)) => {
            tracing::debug!("Ignoring Socket.IO packet type '{}'", kind);
            return true;
        }
        Err(e) => {
            tracing::debug!("Ignoring undecodable Socket.IO packet: {}", e);
            return true;
        }
    };
    events.send(event).is_ok()
}

async fn write_loop(
    mut write: WsWrite,
    mut outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    mut control: mpsc::UnboundedReceiver<WriterCommand>,
) {
    loop {
        tokio::select! {
            biased;
            command = control.recv() => match command {
                Some(WriterCommand::Raw(text)) => {
                    if send_text(&mut write, text).await.is_err() {
                        break;
                    }
                }
                Some(WriterCommand::Close) | None => {
                    // queued events go out before the disconnect
                    while let Ok(message) = outbound.try_recv() {
                        let text = encode_event(&message.event, &message.payload);
                        if send_text(&mut write, text).await.is_err() {
                            return;
                        }
                    }
                    let _ = send_text(&mut write, SOCKET_DISCONNECT.to_string()).await;
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            message = outbound.recv() => match message {
                Some(message) => {
                    let text = encode_event(&message.event, &message.payload);
                    if send_text(&mut write, text).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

async fn send_text(
    write: &mut WsWrite,
    text: String,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    write.send(Message::Text(text.into())).await.map_err(|e| {
        tracing::warn!("Failed to send packet: {}", e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_from_https_host() {
        // テスト項目: https のホストは wss の Engine.IO エンドポイントになる
        // given (前提条件):
        let host = "https://classic.talkomatic.co";

        // when (操作):
        let url = endpoint_url(host).unwrap();

        // then (期待する結果):
        assert_eq!(
            url,
            "wss://classic.talkomatic.co/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_endpoint_url_from_http_host_with_port_and_slash() {
        // テスト項目: http のホスト（ポート・末尾スラッシュ付き）は ws になる
        // given (前提条件):
        let host = "http://127.0.0.1:3000/";

        // when (操作):
        let url = endpoint_url(host).unwrap();

        // then (期待する結果):
        assert_eq!(url, "ws://127.0.0.1:3000/socket.io/?EIO=4&transport=websocket");
    }

    #[test]
    fn test_endpoint_url_rejects_unknown_scheme() {
        // テスト項目: スキーム不明・ホスト名なしの URL はエラーになる
        // given (前提条件):
        let hosts = ["ftp://example.com", "example.com", "https://"];

        // when (操作):
        let results: Vec<_> = hosts.iter().map(|h| endpoint_url(h)).collect();

        // then (期待する結果):
        assert!(
            results
                .iter()
                .all(|r| matches!(r, Err(TransportError::InvalidUrl(_))))
        );
    }

    #[test]
    fn test_dispatch_engine_answers_ping() {
        // テスト項目: サーバーからの PING に PONG を返す
        // given (前提条件):
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();

        // when (操作):
        let keep_going = dispatch_engine("2", &events_tx, &control_tx);

        // then (期待する結果):
        assert!(keep_going);
        match control_rx.try_recv() {
            Ok(WriterCommand::Raw(text)) => assert_eq!(text, "3"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_engine_forwards_events() {
        // テスト項目: MESSAGE パケット内のイベントが ConnectionEvent として転送される
        // given (前提条件):
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (control_tx, _control_rx) = mpsc::unbounded_channel();

        // when (操作):
        let connected = dispatch_engine(r#"40{"sid":"s"}"#, &events_tx, &control_tx);
        let joined = dispatch_engine(
            r#"42["user joined",{"id":"u2","username":"Bea"}]"#,
            &events_tx,
            &control_tx,
        );

        // then (期待する結果):
        assert!(connected && joined);
        assert!(matches!(events_rx.try_recv(), Ok(ConnectionEvent::Connected)));
        match events_rx.try_recv() {
            Ok(ConnectionEvent::UserJoined(user)) => {
                assert_eq!(user.username.as_deref(), Some("Bea"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_engine_reports_connect_error() {
        // テスト項目: CONNECT_ERROR は理由付きの ConnectError になる
        // given (前提条件):
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (control_tx, _control_rx) = mpsc::unbounded_channel();

        // when (操作):
        let keep_going = dispatch_engine(
            r#"44{"message":"Guest limit reached"}"#,
            &events_tx,
            &control_tx,
        );

        // then (期待する結果):
        assert!(keep_going);
        match events_rx.try_recv() {
            Ok(ConnectionEvent::ConnectError(reason)) => assert_eq!(reason, "Guest limit reached"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_engine_stops_on_disconnect_and_close() {
        // テスト項目: Socket.IO の DISCONNECT と Engine.IO の CLOSE で受信を終える
        // given (前提条件):
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (control_tx, _control_rx) = mpsc::unbounded_channel();

        // when (操作):
        let after_disconnect = dispatch_engine("41", &events_tx, &control_tx);
        let after_close = dispatch_engine("1", &events_tx, &control_tx);

        // then (期待する結果):
        assert!(!after_disconnect);
        assert!(!after_close);
    }

    #[test]
    fn test_dispatch_engine_ignores_garbage() {
        // テスト項目: 解釈できないパケットは無視して受信を続ける
        // given (前提条件):
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (control_tx, _control_rx) = mpsc::unbounded_channel();

        // when (操作):
        let results = [
            dispatch_engine("x", &events_tx, &control_tx),
            dispatch_engine("42not json", &events_tx, &control_tx),
            dispatch_engine("6", &events_tx, &control_tx),
        ];

        // then (期待する結果):
        assert!(results.iter().all(|keep_going| *keep_going));
        assert!(events_rx.try_recv().is_err());
    }
}
