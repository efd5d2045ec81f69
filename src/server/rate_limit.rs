//! Sliding-window request limits per client
//!
//! Each client key keeps the instants of its recent requests. A request is
//! refused once the window already holds `limit` of them; the refusal tells
//! the client when the oldest one leaves the window.

use crate::config::RateLimitConfig;
use crate::core::error::DerlgError;
use crate::core::extractors::USER_ID_HEADER;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

const AUTH_PREFIX: &str = "/api/auth/";
const PRUNE_ABOVE: usize = 10_000;

pub struct RateLimiter {
    config: RateLimitConfig,
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: DashMap::new(),
        }
    }

    /// Record a hit for `key`, or return how many seconds to wait
    pub fn check(&self, key: &str, limit: usize, window: Duration, now: Instant) -> Result<(), u64> {
        let mut entry = self.hits.entry(key.to_string()).or_default();
        let hits = entry.value_mut();
        while hits.front().is_some_and(|t| now.duration_since(*t) >= window) {
            hits.pop_front();
        }

        if hits.len() >= limit.max(1) {
            let retry_after = hits
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return Err(retry_after.as_secs().max(1));
        }
        hits.push_back(now);
        Ok(())
    }

    /// Drop clients with no hit inside the longest window
    pub fn prune(&self, now: Instant) {
        let longest = Duration::from_secs(self.config.window_secs.max(self.config.auth_window_secs));
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|t| now.duration_since(*t) < longest));
    }

    /// The budget that applies to `path`, tagged for the key
    fn budget(&self, path: &str) -> (&'static str, usize, Duration) {
        if path.starts_with(AUTH_PREFIX) {
            (
                "auth",
                self.config.auth_requests,
                Duration::from_secs(self.config.auth_window_secs),
            )
        } else {
            (
                "api",
                self.config.requests,
                Duration::from_secs(self.config.window_secs),
            )
        }
    }
}

/// First `X-Forwarded-For` address, else the user id, else anonymous
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = forwarded {
        return addr.to_string();
    }
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|id| format!("user:{}", id.trim()))
        .unwrap_or_else(|| "anonymous".to_string())
}

pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if !limiter.config.enabled || !path.starts_with("/api/") {
        return next.run(request).await;
    }

    let now = Instant::now();
    if limiter.hits.len() > PRUNE_ABOVE {
        limiter.prune(now);
    }

    let (scope, limit, window) = limiter.budget(path);
    let key = format!("{}:{}", scope, client_key(request.headers()));
    if let Err(retry_after_secs) = limiter.check(&key, limit, window, now) {
        tracing::warn!(client = %key, retry_after_secs, "rate limit exceeded");
        return DerlgError::RateLimited { retry_after_secs }.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            requests: 3,
            window_secs: 60,
            auth_requests: 1,
            auth_window_secs: 60,
        })
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter();
        let window = Duration::from_secs(60);
        let start = Instant::now();

        for i in 0..3 {
            assert!(limiter.check("c", 3, window, start + Duration::from_secs(i)).is_ok());
        }
        let retry = limiter.check("c", 3, window, start + Duration::from_secs(10)).unwrap_err();
        assert_eq!(retry, 50);

        assert!(limiter.check("c", 3, window, start + Duration::from_secs(60)).is_ok());
        assert!(limiter.check("other", 3, window, start).is_ok());
    }

    #[test]
    fn test_auth_routes_have_their_own_budget() {
        let limiter = limiter();
        assert_eq!(limiter.budget("/api/auth/register").1, 1);
        assert_eq!(limiter.budget("/api/hotels").1, 3);
    }

    #[test]
    fn test_client_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers), "anonymous");

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u-1"));
        assert_eq!(client_key(&headers), "user:u-1");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn test_prune_forgets_idle_clients() {
        let limiter = limiter();
        let start = Instant::now();
        limiter.check("idle", 3, Duration::from_secs(60), start).unwrap();
        limiter.prune(start + Duration::from_secs(120));
        assert!(limiter.hits.is_empty());
    }
}
