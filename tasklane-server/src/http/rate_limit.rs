//! Per-client request limit on `/api`
//!
//! Each client IP gets `max_requests` per `window`; the next request is
//! answered with a 429 envelope and `Retry-After`. Clients are told apart
//! by the connection's peer address. Requests without one (in-process
//! callers) share a single bucket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::Clock;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use super::error::error_body;

/// Tracked clients above which idle buckets are dropped
const SHRINK_THRESHOLD: usize = 10_000;

/// Requests allowed per client per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Shared keyed limiter, cloned into the middleware
#[derive(Clone)]
pub struct ClientLimiter {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl ClientLimiter {
    /// `None` when the limit admits nothing measurable (zero requests or window).
    pub fn new(limit: RateLimit) -> Option<Self> {
        let burst = NonZeroU32::new(limit.max_requests)?;
        let quota = Quota::with_period(limit.window / limit.max_requests)?.allow_burst(burst);
        Some(Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        })
    }

    /// `Err` carries how long the client must wait.
    fn check(&self, client: IpAddr) -> Result<(), Duration> {
        if self.limiter.len() > SHRINK_THRESHOLD {
            self.limiter.retain_recent();
        }
        self.limiter
            .check_key(&client)
            .map_err(|not_until| not_until.wait_time_from(self.limiter.clock().now()))
    }
}

fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip())
}

/// Middleware body; see [`ClientLimiter`].
pub async fn limit_api_requests(limiter: ClientLimiter, req: Request, next: Next) -> Response {
    if !is_api_path(req.uri().path()) {
        return next.run(req).await;
    }

    let client = client_ip(&req);
    match limiter.check(client) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            tracing::debug!(%client, wait_secs = wait.as_secs(), "rate limit reached");
            too_many_requests(wait)
        }
    }
}

fn too_many_requests(wait: Duration) -> Response {
    // Round up so a client never retries too early.
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    let mut response = error_body(
        StatusCode::TOO_MANY_REQUESTS,
        "Too many requests",
        format!("Rate limit exceeded, retry in {secs}s"),
    );
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
    response
}
