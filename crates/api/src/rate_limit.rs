//! Per-client request rate limiting (token bucket).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use moka::sync::Cache;

use craftmart_infra::config::RateLimitConfig;

/// Upper bound on clients tracked at once; the least recently used buckets
/// are evicted beyond it.
const MAX_TRACKED_CLIENTS: u64 = 100_000;

#[derive(Debug, Clone)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    /// Tokens regained per second.
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, window: Duration, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: capacity / window.as_secs_f64(),
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Allows `max_requests` per `window` for each client key, refilling
/// continuously.
///
/// Buckets live in a bounded cache and are evicted once a client has been idle
/// for a full window, by which time its bucket would be full again anyway.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Cache<Arc<str>, Arc<Mutex<TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_capacity(config, MAX_TRACKED_CLIENTS)
    }

    pub fn with_capacity(config: RateLimitConfig, max_clients: u64) -> Self {
        let buckets = Cache::builder()
            .max_capacity(max_clients)
            .time_to_idle(config.window)
            .build();
        Self { config, buckets }
    }

    /// Record one request from `client`; `false` when it is over the limit.
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let key: Arc<str> = Arc::from(client);
        let bucket = self.buckets.get_with(key, || {
            Arc::new(Mutex::new(TokenBucket::new(
                self.config.max_requests,
                self.config.window,
                now,
            )))
        });

        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_consume(now)
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> u64 {
        self.buckets.run_pending_tasks();
        self.buckets.entry_count()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked_clients", &self.buckets.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
    }

    #[test]
    fn blocks_after_capacity_is_spent() {
        let limiter = limiter(3, 60);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
    }

    #[test]
    fn clients_have_separate_buckets() {
        let limiter = limiter(1, 60);
        let now = Instant::now();
        assert!(limiter.check_at("a", now));
        assert!(!limiter.check_at("a", now));
        assert!(limiter.check_at("b", now));
    }

    #[test]
    fn tracked_clients_stay_bounded() {
        let limiter = RateLimiter::with_capacity(
            RateLimitConfig {
                max_requests: 5,
                window: Duration::from_secs(600),
            },
            100,
        );
        let now = Instant::now();
        for i in 0..5_000 {
            assert!(limiter.check_at(&format!("198.51.100.{i}"), now));
        }
        assert!(limiter.tracked_clients() < 1_000);
    }

    #[test]
    fn tokens_refill_over_the_window() {
        let limiter = limiter(2, 10);
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("a", start));
        assert!(!limiter.check_at("a", start));

        // One token comes back every five seconds.
        assert!(limiter.check_at("a", start + Duration::from_secs(5)));
        assert!(!limiter.check_at("a", start + Duration::from_secs(5)));
    }
}
