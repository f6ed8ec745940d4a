//! HTTP server command
//!
//! Runs the users/todos API against Postgres, or against the in-memory
//! store with `--in-memory`.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use tasklane_server::db::pool::{DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS};
use tasklane_server::db::{create_pool, migrations, PoolSettings};
use tasklane_server::{run_server, MemoryStore, PgStore, RateLimit, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', env = "SERVER_ADDR", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    /// Seconds a request waits for a free database connection
    #[arg(long, env = "DATABASE_ACQUIRE_TIMEOUT", default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS)]
    pub acquire_timeout: u64,

    /// Requests per minute each client may send to /api (0 = unlimited)
    #[arg(long, env = "TASKLANE_RATE_LIMIT", default_value_t = 5)]
    pub rate_limit: u32,

    /// Keep all data in process memory instead of Postgres (lost on exit)
    #[arg(long)]
    pub in_memory: bool,

    /// Do not run schema migrations at startup
    #[arg(long)]
    pub skip_migrations: bool,
}

impl ServeArgs {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            cors_permissive: self.cors_permissive,
            rate_limit: (self.rate_limit > 0).then(|| RateLimit {
                max_requests: self.rate_limit,
                window: Duration::from_secs(60),
            }),
            ..ServerConfig::default()
        }
    }

    fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout),
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = args.server_config();

    if args.in_memory {
        tracing::warn!("Using in-memory store; data is lost on shutdown");
        return run_server(MemoryStore::new(), config)
            .await
            .context("Server error");
    }

    let database_url = args
        .database_url
        .clone()
        .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env or .env, or pass --in-memory")?;

    tracing::info!("Starting tasklane server on {}", config.bind_addr);

    let pool = create_pool(&database_url, &args.pool_settings())
        .await
        .context("Failed to create database pool")?;

    if args.skip_migrations {
        tracing::info!("Skipping schema migrations");
    } else {
        migrations::run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    // Blocks until shutdown
    run_server(PgStore::new(pool), config)
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> ServeArgs {
        ServeArgs::try_parse_from(std::iter::once("serve").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn rate_limit_zero_disables_it() {
        let args = parse(&["--in-memory", "--rate-limit", "0"]);
        assert_eq!(args.server_config().rate_limit, None);

        let args = parse(&["--in-memory", "--rate-limit", "30"]);
        assert_eq!(
            args.server_config().rate_limit,
            Some(RateLimit {
                max_requests: 30,
                window: Duration::from_secs(60),
            })
        );
    }

    #[test]
    fn pool_settings_follow_flags() {
        let args = parse(&["--max-connections", "8", "--acquire-timeout", "2"]);
        assert_eq!(
            args.pool_settings(),
            PoolSettings {
                max_connections: 8,
                acquire_timeout: Duration::from_secs(2),
            }
        );
    }
}
