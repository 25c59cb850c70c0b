//! Token-bucket rate limiter shared by all concurrent resolutions.
//!
//! A fixed number of permits is released per fixed interval. The limiter
//! serializes *admission* only: once a caller has its permit it runs
//! concurrently with everyone else.
//!
//! Constructed explicitly and injected into the crawler, so two crawl
//! sessions never share quota unless they are handed the same `Arc`.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    window_start: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    interval: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// `tokens_per_interval` is clamped to at least one permit.
    pub fn new(tokens_per_interval: u32, interval: Duration) -> Self {
        let capacity = tokens_per_interval.max(1);
        Self {
            capacity,
            interval,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                window_start: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.tokens_per_interval, config.interval())
    }

    /// No admission control at all; useful for in-memory resolvers.
    pub fn unlimited() -> Self {
        Self::new(u32::MAX, Duration::ZERO)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for and consume one permit.
    ///
    /// An interval too large to add to an `Instant` means the bucket never
    /// refills; callers past the first window wait forever.
    pub async fn acquire(&self) {
        loop {
            let refill_at = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let refill_at = bucket.window_start.checked_add(self.interval);
                if refill_at.is_some_and(|at| now >= at) {
                    bucket.window_start = now;
                    bucket.tokens = self.capacity;
                }
                if bucket.tokens > 0 {
                    bucket.tokens -= 1;
                    return;
                }
                bucket.window_start.checked_add(self.interval)
            };
            match refill_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_wait() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_across_tasks() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(50)));
        let start = Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        // 5 permits at 1 per 50ms: the last one cannot be admitted before 200ms.
        assert!(admitted[4] - start >= Duration::from_millis(200));
        for pair in admitted.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::unlimited();
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_zero_tokens_clamped() {
        let limiter = RateLimiter::new(0, Duration::from_millis(10));
        assert_eq!(limiter.capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_never_refills() {
        let limiter = RateLimiter::new(1, Duration::from_millis(u64::MAX));
        limiter.acquire().await;

        let second = tokio::time::timeout(Duration::from_secs(3600), limiter.acquire()).await;
        assert!(second.is_err());
    }
}
