//! Router harness shared by the HTTP tests

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use super::server::{build_router, ServerConfig};
use crate::db::MemoryStore;
use crate::state::AppState;

/// Full router over a fresh in-memory store, without the request limit.
pub fn test_app() -> Router {
    let config = ServerConfig {
        rate_limit: None,
        ..ServerConfig::default()
    };
    build_router(AppState::new(MemoryStore::new()), &config)
}

/// Request with an optional JSON body.
pub fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap()
}

/// Send `req`, returning the status, headers and JSON body (`Null` if empty).
pub async fn send_request(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
}

/// Send one request, returning the status and the JSON body.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, json) = send_request(app, request(method, uri, body)).await;
    (status, json)
}
