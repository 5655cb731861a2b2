//! Test utilities for ticketer-core
//!
//! Provides a mock Gemini server that answers `generateContent` calls with a
//! canned ALDI receipt, so the real HTTP backend can be exercised offline.

use axum::{
    extract::{Json, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// API key the mock server accepts
pub const TEST_API_KEY: &str = "test-gemini-key";

/// Receipt JSON returned for extraction requests
pub const MOCK_RECEIPT_JSON: &str = r#"{"store_name":"ALDI","bought_date":"2024-01-15","items":[{"name":"Milk","quantity":2,"price":0.92},{"name":"Bread","quantity":1,"price":1.2}],"discounts":0.5}"#;

/// Mock Gemini server for testing and development
pub struct MockGeminiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new().route(
            "/v1beta/models/:model",
            get(handle_model).post(handle_generate),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|k| k == TEST_API_KEY)
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}})),
    )
        .into_response()
}

/// Model metadata endpoint (health check)
async fn handle_model(Path(model): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return forbidden();
    }
    Json(json!({"name": format!("models/{}", model)})).into_response()
}

/// `generateContent`: JSON receipt when a response schema is requested,
/// otherwise the store name
async fn handle_generate(
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return forbidden();
    }
    if !model.ends_with(":generateContent") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let has_image = request["contents"][0]["parts"]
        .as_array()
        .is_some_and(|parts| parts.iter().any(|p| p.get("inlineData").is_some()));
    if !has_image {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": "missing image"}})),
        )
            .into_response();
    }

    let text = if request.get("generationConfig").is_some() {
        MOCK_RECEIPT_JSON
    } else {
        "ALDI\n"
    };

    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}
