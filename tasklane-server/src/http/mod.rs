//! HTTP server layer
//!
//! Axum server with:
//! - CORS (localhost only by default)
//! - Request tracing
//! - Per-client request limit on `/api`
//! - `X-Idempotency-Key` replay for unsafe methods
//! - Per-request transactions for mutating routes
//! - JSON envelopes for every response, errors included

pub mod error;
pub mod extractors;
pub mod idempotency;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod server;
pub mod transaction;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::ApiError;
pub use rate_limit::RateLimit;
pub use server::{build_router, run_server, ServerConfig};
pub use transaction::with_transaction;
