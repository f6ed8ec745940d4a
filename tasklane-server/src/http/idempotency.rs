//! Replay of unsafe requests keyed by `X-Idempotency-Key`
//!
//! A POST, PUT, PATCH or DELETE carrying the header runs once; repeats of
//! the same key within the lifetime get the stored status, headers and body
//! back without reaching a handler. Requests sharing a key are serialized,
//! so a retry that races the first attempt waits for its outcome.
//!
//! Throttled (429) and server-error responses are not stored, which leaves
//! the client free to retry them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use super::error::{error_body, ApiError};
use crate::error::AppError;

pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";

/// How long a stored response is replayed
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Keys are UUID-sized
const KEY_LENGTH: usize = 36;

/// Largest response body kept for replay
const MAX_STORED_BODY: usize = 1024 * 1024;

/// Response captured for replay
#[derive(Debug, Clone)]
struct StoredResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    stored_at: Instant,
}

impl StoredResponse {
    fn replay(&self) -> Response {
        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }
}

/// Outcome of looking up a key
#[derive(Debug)]
enum IdempotencyCheck<'a> {
    /// Nothing live under this key; run the request
    NotFound,
    /// Same key already answered; send this back
    AlreadyProcessed(&'a StoredResponse),
}

fn check(stored: Option<&StoredResponse>, lifetime: Duration) -> IdempotencyCheck<'_> {
    match stored {
        Some(stored) if stored.stored_at.elapsed() < lifetime => {
            IdempotencyCheck::AlreadyProcessed(stored)
        }
        _ => IdempotencyCheck::NotFound,
    }
}

type Slot = Arc<Mutex<Option<StoredResponse>>>;

/// Stored responses by key, shared across requests
#[derive(Clone)]
pub struct IdempotencyCache {
    lifetime: Duration,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl IdempotencyCache {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            slots: Arc::default(),
        }
    }

    /// Slot for `key`, dropping expired slots nobody is using.
    async fn slot(&self, key: &str) -> Slot {
        let lifetime = self.lifetime;
        let mut slots = self.slots.lock().await;
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot.try_lock().map_or(true, |stored| {
                    matches!(
                        check(stored.as_ref(), lifetime),
                        IdempotencyCheck::AlreadyProcessed(_)
                    )
                })
        });
        Arc::clone(slots.entry(key.to_owned()).or_default())
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new(DEFAULT_LIFETIME)
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn is_replayable(status: StatusCode) -> bool {
    status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error()
}

/// Middleware body; see the module docs.
pub async fn replay_idempotent(cache: IdempotencyCache, req: Request, next: Next) -> Response {
    if is_safe(req.method()) {
        return next.run(req).await;
    }
    let key = match req.headers().get(IDEMPOTENCY_KEY_HEADER) {
        None => return next.run(req).await,
        Some(value) => match value.to_str() {
            Ok(key) if key.len() == KEY_LENGTH => key.to_owned(),
            _ => {
                return error_body(
                    StatusCode::BAD_REQUEST,
                    "Invalid idempotency key",
                    format!("X-Idempotency-Key must be {KEY_LENGTH} characters"),
                )
            }
        },
    };

    let slot = cache.slot(&key).await;
    let mut stored = slot.lock().await;
    if let IdempotencyCheck::AlreadyProcessed(hit) = check(stored.as_ref(), cache.lifetime) {
        tracing::debug!(%key, status = %hit.status, "replaying stored response");
        return hit.replay();
    }

    let response = next.run(req).await;
    if !is_replayable(response.status()) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let body = match to_bytes(body, MAX_STORED_BODY).await {
        Ok(body) => body,
        Err(e) => return ApiError::from(AppError::internal(e)).into_response(),
    };
    *stored = Some(StoredResponse {
        status: parts.status,
        headers: parts.headers.clone(),
        body: body.clone(),
        stored_at: Instant::now(),
    });
    Response::from_parts(parts, Body::from(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{request, send, send_request, test_app};
    use axum::http::HeaderValue;
    use axum::Router;
    use serde_json::{json, Value};

    const KEY: &str = "6f1c1b7e-2f59-4c3b-9a57-0e3a2b1d4c5f";

    async fn send_keyed(
        app: &Router,
        method: Method,
        uri: &str,
        key: &'static str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = request(method, uri, body);
        req.headers_mut()
            .insert(IDEMPOTENCY_KEY_HEADER, HeaderValue::from_static(key));
        let (status, _, body) = send_request(app, req).await;
        (status, body)
    }

    fn stored(age: Duration) -> StoredResponse {
        StoredResponse {
            status: StatusCode::CREATED,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"{}"),
            stored_at: Instant::now() - age,
        }
    }

    #[test]
    fn expired_entry_is_not_replayed() {
        let lifetime = Duration::from_secs(60);
        assert!(matches!(check(None, lifetime), IdempotencyCheck::NotFound));
        assert!(matches!(
            check(Some(&stored(Duration::from_secs(1))), lifetime),
            IdempotencyCheck::AlreadyProcessed(_)
        ));
        assert!(matches!(
            check(Some(&stored(Duration::from_secs(61))), lifetime),
            IdempotencyCheck::NotFound
        ));
    }

    #[test]
    fn throttled_and_failed_responses_are_not_stored() {
        assert!(is_replayable(StatusCode::CREATED));
        assert!(is_replayable(StatusCode::CONFLICT));
        assert!(!is_replayable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_replayable(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn repeated_create_is_replayed_not_reapplied() {
        let app = test_app();
        let todo = json!({"title": "Pay rent", "status": "pending"});

        let (first_status, first) =
            send_keyed(&app, Method::POST, "/api/todos", KEY, Some(todo.clone())).await;
        let (second_status, second) =
            send_keyed(&app, Method::POST, "/api/todos", KEY, Some(todo)).await;

        assert_eq!(first_status, StatusCode::CREATED);
        assert_eq!(second_status, StatusCode::CREATED);
        assert_eq!(first, second);

        let (_, list) = send(&app, Method::GET, "/api/todos", None).await;
        assert_eq!(list["meta"]["totalItems"], 1);
    }

    #[tokio::test]
    async fn requests_without_key_run_every_time() {
        let app = test_app();
        let todo = json!({"title": "Pay rent", "status": "pending"});
        send(&app, Method::POST, "/api/todos", Some(todo.clone())).await;
        send(&app, Method::POST, "/api/todos", Some(todo)).await;

        let (_, list) = send(&app, Method::GET, "/api/todos", None).await;
        assert_eq!(list["meta"]["totalItems"], 2);
    }

    #[tokio::test]
    async fn short_key_is_400_envelope() {
        let app = test_app();
        let (status, body) = send_keyed(
            &app,
            Method::POST,
            "/api/todos",
            "abc",
            Some(json!({"title": "Pay rent", "status": "pending"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "message": "Invalid idempotency key",
                "error": "X-Idempotency-Key must be 36 characters",
                "success": false
            })
        );
        let (_, list) = send(&app, Method::GET, "/api/todos", None).await;
        assert_eq!(list["meta"]["totalItems"], 0);
    }

    #[tokio::test]
    async fn safe_methods_ignore_the_key() {
        let app = test_app();
        let (status, _) = send_keyed(&app, Method::GET, "/api/todos", "abc", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
