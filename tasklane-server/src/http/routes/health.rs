//! Liveness endpoint

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /api
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "success",
        message: "API is running",
    })
}

/// Health routes
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/api", get(health))
        .route("/api/", get(health))
}
