//! tasklane-server: users and todos over a transactional REST API
//!
//! Layers, leaf first:
//! - [`models`]: records, pagination, password hashing
//! - [`validation`]: declarative request rules and message catalogs
//! - [`db`]: repository traits with Postgres and in-memory stores
//! - [`services`]: business rules and the error taxonomy
//! - [`http`]: axum routes, envelopes and the per-request transaction

pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod services;
pub mod state;
pub mod validation;

pub use db::{MemoryStore, PgStore, Store};
pub use error::{AppError, AppResult, ServerError};
pub use http::{build_router, run_server, RateLimit, ServerConfig};
pub use state::AppState;
