//! Liveness server execution logic.

use std::{future::Future, net::SocketAddr};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    error::KeepaliveError,
    handler::{health_check, index},
};

/// HTTP liveness server
///
/// # Example
///
/// ```ignore
/// let server = KeepaliveServer::bind("0.0.0.0", 3000).await?;
/// server.run(shutdown_signal()).await?;
/// ```
pub struct KeepaliveServer {
    listener: TcpListener,
}

impl KeepaliveServer {
    /// Bind the liveness server to the host and port
    ///
    /// # Errors
    ///
    /// Returns [`KeepaliveError::Bind`] if the address cannot be bound.
    pub async fn bind(host: &str, port: u16) -> Result<Self, KeepaliveError> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| KeepaliveError::Bind {
                addr: bind_addr,
                source,
            })?;
        Ok(Self { listener })
    }

    /// The address the server is actually listening on
    pub fn local_addr(&self) -> Result<SocketAddr, KeepaliveError> {
        Ok(self.listener.local_addr()?)
    }

    /// Build the router serving the liveness endpoints
    pub fn router() -> Router {
        Router::new()
            .route("/", get(index))
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve requests until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), KeepaliveError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("[http] listening on {}", self.listener.local_addr()?);

        axum::serve(self.listener, Self::router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("[http] liveness server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    async fn spawn_test_server() -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let server = KeepaliveServer::bind("127.0.0.1", 0).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .run(async {
                    let _ = stop_rx.await;
                })
                .await
                .unwrap();
        });
        (addr, stop_tx, handle)
    }

    #[tokio::test]
    async fn test_root_serves_plain_text_banner() {
        // テスト項目: `/` にアクセスすると text/plain のバナーが返る
        // given (前提条件):
        let (addr, stop_tx, handle) = spawn_test_server().await;

        // when (操作):
        let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();

        // then (期待する結果):
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/plain"));
        let body = response.text().await.unwrap();
        assert!(body.starts_with("Jumble Clanker is running."));

        stop_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_health_endpoint_returns_json() {
        // テスト項目: `/api/health` が JSON で status=ok を返す
        // given (前提条件):
        let (addr, stop_tx, handle) = spawn_test_server().await;

        // when (操作):
        let body: serde_json::Value = reqwest::get(format!("http://{}/api/health", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(body, serde_json::json!({"status": "ok"}));

        stop_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        // テスト項目: 使用中のポートへのバインドは Bind エラーになる
        // given (前提条件):
        let first = KeepaliveServer::bind("127.0.0.1", 0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        // when (操作):
        let result = KeepaliveServer::bind("127.0.0.1", port).await;

        // then (期待する結果):
        assert!(matches!(result, Err(KeepaliveError::Bind { .. })));
    }
}
