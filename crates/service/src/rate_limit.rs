//! Per-client sliding-window rate limiting for the generate endpoint.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding 60-second window, one bucket per client IP. Buckets are pruned on
/// every check, so memory stays proportional to active clients.
pub struct RateLimiter {
    requests_per_minute: u32,
    buckets: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self { requests_per_minute: requests_per_minute.max(1), buckets: DashMap::new() }
    }

    /// Record a request for the client and report whether it is allowed.
    pub fn check(&self, client_ip: &str) -> bool {
        let now = Instant::now();
        let mut bucket = self.buckets.entry(client_ip.to_string()).or_default();
        bucket.retain(|t| now.duration_since(*t) < WINDOW);
        if bucket.len() >= self.requests_per_minute as usize {
            debug!(%client_ip, "rate limit exceeded");
            return false;
        }
        bucket.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_denies() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check("1.1.1.1"));
        assert!(limiter.check("2.2.2.2"));
        assert!(!limiter.check("1.1.1.1"));
    }

    #[test]
    fn zero_limit_clamps_to_one() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.check("3.3.3.3"));
        assert!(!limiter.check("3.3.3.3"));
    }
}
