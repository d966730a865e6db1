//! Per-client rate limiting
//!
//! Token bucket per remote IP guarding the analyze endpoint: 30 requests
//! per minute, burst 30. Exhausted buckets reject with 429 before the
//! scoring engine runs. Buckets are lazily created and the map is cleared
//! if it ever grows past its bound.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use parking_lot::Mutex;

use crate::constants::{RATE_LIMIT_MAX_CLIENTS, RATE_LIMIT_PER_MINUTE};
use crate::error::AppError;

type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct RateLimitMap {
    limiters: Mutex<HashMap<IpAddr, Arc<IpRateLimiter>>>,
    per_minute: u32,
}

impl RateLimitMap {
    pub fn new(per_minute: u32) -> Self {
        Self {
            limiters: Mutex::new(HashMap::new()),
            per_minute,
        }
    }

    /// Non-blocking token acquisition for one client.
    pub fn check(&self, ip: IpAddr) -> bool {
        let limiter = {
            let mut limiters = self.limiters.lock();

            if limiters.len() > RATE_LIMIT_MAX_CLIENTS {
                tracing::warn!("rate limiter map exceeded its bound, clearing");
                limiters.clear();
            }

            limiters
                .entry(ip)
                .or_insert_with(|| {
                    let quota = Quota::per_minute(
                        NonZeroU32::new(self.per_minute.max(1)).unwrap(),
                    );
                    Arc::new(RateLimiter::direct(quota))
                })
                .clone()
        };

        limiter.check().is_ok()
    }
}

impl Default for RateLimitMap {
    fn default() -> Self {
        Self::new(RATE_LIMIT_PER_MINUTE)
    }
}

/// Axum layer wrapping the analyze route. Requests without a resolvable
/// peer address share one bucket rather than bypassing the limit.
pub async fn rate_limit(
    State(limits): State<Arc<RateLimitMap>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if !limits.check(ip) {
        tracing::debug!("rate limited {ip}");
        return AppError::RateLimited.into_response();
    }

    next.run(request).await
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_capacity_then_rejection() {
        let limits = RateLimitMap::new(30);
        let ip: IpAddr = "203.0.113.7".parse().unwrap();

        // requests 1..=30 pass, request 31 is rejected
        for i in 1..=30 {
            assert!(limits.check(ip), "request {i} should pass");
        }
        assert!(!limits.check(ip), "request 31 must be rejected");
    }

    #[test]
    fn test_buckets_are_per_client() {
        let limits = RateLimitMap::new(2);
        let a: IpAddr = "203.0.113.1".parse().unwrap();
        let b: IpAddr = "203.0.113.2".parse().unwrap();

        assert!(limits.check(a));
        assert!(limits.check(a));
        assert!(!limits.check(a));
        // a's exhaustion never touches b
        assert!(limits.check(b));
    }
}
