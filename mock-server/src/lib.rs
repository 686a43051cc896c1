//! httpbin-compatible mock server used by the networking tests and demo.
//!
//! Only the handful of endpoints the client exercises are implemented:
//! echoing GET/POST requests, arbitrary status codes, slow responses, empty
//! and non-ASCII bodies, and base64-encoded fixture payloads.

use std::{collections::BTreeMap, time::Duration};

use axum::{
    extract::Path,
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Upper bound for `/delay/{millis}` so a typo cannot wedge a test run.
pub const MAX_DELAY_MS: u64 = 10_000;

/// Body returned by the echo endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub json: Option<serde_json::Value>,
}

pub fn app() -> Router {
    Router::new()
        .route("/get", get(echo_get))
        .route("/post", post(echo_post))
        .route("/status/{code}", get(status).post(status))
        .route("/delay/{millis}", get(delay))
        .route("/empty", get(empty))
        .route("/utf8", get(utf8))
        .route("/base64/{value}", get(base64_body))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo_get(method: Method, uri: Uri, headers: HeaderMap) -> Json<Echo> {
    Json(Echo {
        method: method.to_string(),
        url: uri.to_string(),
        headers: header_map(&headers),
        data: String::new(),
        json: None,
    })
}

async fn echo_post(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Echo> {
    let json = serde_json::from_str(&body).ok();
    Json(Echo {
        method: method.to_string(),
        url: uri.to_string(),
        headers: header_map(&headers),
        data: body,
        json,
    })
}

async fn status(Path(code): Path<u16>) -> Result<StatusCode, StatusCode> {
    StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)
}

async fn delay(Path(millis): Path<u64>) -> Json<serde_json::Value> {
    let millis = millis.min(MAX_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(serde_json::json!({ "delayed_ms": millis }))
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn utf8() -> &'static str {
    "héllo wörld ✓"
}

async fn base64_body(Path(value): Path<String>) -> Result<Vec<u8>, (StatusCode, String)> {
    URL_SAFE
        .decode(value.as_bytes())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid base64: {e}")))
}

/// Collect headers as lowercase name to value, skipping non-ASCII values.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
