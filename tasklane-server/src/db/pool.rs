//! Postgres pool settings
//!
//! The pool is the only long-lived shared resource of the server. Every
//! request transaction holds one connection until commit or rollback, so
//! `max_connections` bounds concurrent writes and `acquire_timeout` bounds
//! how long a request waits for a free slot before failing with a 500.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Seconds a request may wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

impl PoolSettings {
    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections.max(1))
            .acquire_timeout(self.acquire_timeout)
    }
}

/// Connect a pool to `database_url`.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/tasklane", &PoolSettings::default()).await?;
/// let store = PgStore::new(pool);
/// ```
pub async fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(
        max_connections = settings.max_connections,
        acquire_timeout_secs = settings.acquire_timeout.as_secs(),
        "connecting database pool"
    );
    settings.options().connect(database_url).await
}
