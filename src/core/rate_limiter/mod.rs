//! Per-key request rate limiting
//!
//! Sliding one-minute window over per-key timestamp lists. The check and
//! the record happen under one lock so two near-simultaneous requests
//! cannot both slip under the limit.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::RateLimitConfig;

/// Result of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current: u32,
    pub limit: u32,
}

/// Sliding-window rate limiter keyed by an arbitrary string
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Duration,
    entries: DashMap<String, Mutex<Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            window: Duration::from_secs(60),
            entries: DashMap::new(),
        }
    }

    /// Atomically check the window and record the request if allowed
    pub fn check_and_record(&self, key: &str) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision {
                allowed: true,
                current: 0,
                limit: self.config.requests_per_minute,
            };
        }

        let now = Instant::now();
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Vec::new()));
        let mut timestamps = entry.lock();

        timestamps.retain(|t| now.duration_since(*t) < self.window);

        let limit = self.config.requests_per_minute;
        let current = timestamps.len() as u32;
        if current >= limit {
            debug!(key, current, limit, "request rate limited");
            return RateLimitDecision {
                allowed: false,
                current,
                limit,
            };
        }

        timestamps.push(now);
        RateLimitDecision {
            allowed: true,
            current: current + 1,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rpm: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            requests_per_minute: rpm,
        })
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.check_and_record("tenant:user").allowed);
        }
        let denied = limiter.check_and_record("tenant:user");
        assert!(!denied.allowed);
        assert_eq!(denied.current, 3);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1);
        assert!(limiter.check_and_record("a").allowed);
        assert!(limiter.check_and_record("b").allowed);
        assert!(!limiter.check_and_record("a").allowed);
    }

    #[test]
    fn test_disabled_limiter_always_allows() {
        let limiter = RateLimiter::new(RateLimitConfig {
            enabled: false,
            requests_per_minute: 1,
        });
        for _ in 0..10 {
            assert!(limiter.check_and_record("k").allowed);
        }
    }
}
