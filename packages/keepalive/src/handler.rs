//! HTTP endpoint handlers.

use axum::Json;

/// Plain-text banner served at `/`.
pub const BANNER: &str = "Jumble Clanker is running.\nSet ROOM_ID and check logs.\n";

/// Root endpoint
pub async fn index() -> &'static str {
    BANNER
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
