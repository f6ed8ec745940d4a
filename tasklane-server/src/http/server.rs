//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Per-client request limit on `/api` (5 per minute by default)
//! - Idempotent replay of keyed POST/PUT/PATCH/DELETE
//! - Panics rendered as the 500 error envelope
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{from_fn, Next};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::error::{method_not_allowed, panic_response, route_not_found};
use super::idempotency::{self, replay_idempotent, IdempotencyCache};
use super::rate_limit::{limit_api_requests, ClientLimiter, RateLimit};
use super::routes;
use crate::db::Store;
use crate::error::ServerError;
use crate::state::AppState;

/// Origins allowed when CORS is not permissive
const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8080",
];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,

    /// Per-client limit on `/api`; `None` disables it
    pub rate_limit: Option<RateLimit>,

    /// How long keyed responses are replayed (default: 30 minutes)
    pub idempotency_lifetime: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_permissive: false,
            rate_limit: Some(RateLimit::default()),
            idempotency_lifetime: idempotency::DEFAULT_LIFETIME,
        }
    }
}

/// Build the application router over `state`.
pub fn build_router<D: Store>(state: AppState<D>, config: &ServerConfig) -> Router {
    let app = routes::api_router()
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .with_state(state);
    with_middleware(app, config)
}

fn with_middleware(router: Router, config: &ServerConfig) -> Router {
    let mut router = router.layer(CatchPanicLayer::custom(panic_response));

    match config.rate_limit.and_then(ClientLimiter::new) {
        Some(limiter) => {
            router = router.layer(from_fn(move |req: Request, next: Next| {
                limit_api_requests(limiter.clone(), req, next)
            }));
        }
        None => tracing::warn!("Request rate limit disabled"),
    }

    let cache = IdempotencyCache::new(config.idempotency_lifetime);
    router = router.layer(from_fn(move |req: Request, next: Next| {
        replay_idempotent(cache.clone(), req, next)
    }));

    with_cors(router, config.cors_permissive).layer(TraceLayer::new_for_http())
}

fn with_cors(router: Router, cors_permissive: bool) -> Router {
    let cors = if cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(LOCAL_ORIGINS.map(HeaderValue::from_static))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    router.layer(cors)
}

/// Run the HTTP server until a shutdown signal arrives.
///
/// # Example
///
/// ```ignore
/// let store = PgStore::new(create_pool(&database_url, &PoolSettings::default()).await?);
/// run_server(store, ServerConfig::default()).await?;
/// ```
pub async fn run_server<D: Store>(store: D, config: ServerConfig) -> Result<(), ServerError> {
    let app = build_router(AppState::new(store), &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    // Peer addresses key the request limit.
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::http::test_support::{send, test_app};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::routing::get;
    use serde_json::json;
    use tower::ServiceExt;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.cors_permissive);
        assert_eq!(config.rate_limit, Some(RateLimit::default()));
        assert_eq!(config.idempotency_lifetime, Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn health_on_both_paths() {
        let app = test_app();
        for path in ["/api", "/api/"] {
            let (status, body) = send(&app, Method::GET, path, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"status": "success", "message": "API is running"}));
        }
    }

    #[tokio::test]
    async fn unmatched_route_is_404_envelope() {
        let (status, body) = send(&test_app(), Method::GET, "/x", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({"message": "Route not found", "error": "Cannot GET /x", "success": false})
        );
    }

    #[tokio::test]
    async fn wrong_method_on_known_path_is_405_envelope() {
        let app = test_app();
        let (status, body) = send(&app, Method::PATCH, "/api/todos", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body,
            json!({"message": "Method not allowed", "error": "Cannot PATCH /api/todos", "success": false})
        );

        let (status, body) = send(&app, Method::POST, "/api/todos/abc", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Cannot POST /api/todos/abc");
    }

    #[tokio::test]
    async fn default_config_limits_api_requests() {
        let app = build_router(AppState::new(MemoryStore::new()), &ServerConfig::default());
        for _ in 0..5 {
            let (status, _) = send(&app, Method::GET, "/api", None).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, Method::GET, "/api/todos", None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["message"], "Too many requests");

        let (status, _) = send(&app, Method::GET, "/elsewhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn panicking_handler_is_500_envelope() {
        async fn boom() -> &'static str {
            panic!("boom")
        }
        let app = with_middleware(
            Router::new().route("/boom", get(boom)),
            &ServerConfig::default(),
        );

        let (status, body) = send(&app, Method::GET, "/boom", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"message": "Internal Server Error", "error": "handler panicked", "success": false})
        );
    }

    #[tokio::test]
    async fn local_origin_gets_cors_header() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }
}
