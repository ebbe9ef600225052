//! Sliding-window request rate limiter.
//!
//! A single limiter instance gates every outbound request the crawler and
//! download workers make, so the archive never sees more than
//! `max_requests` requests in any `interval`.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window.
    pub max_requests: usize,
    /// Window width.
    pub interval: Duration,
    /// Sleep granularity while waiting for capacity.
    pub backoff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 15,
            interval: Duration::from_secs(60),
            backoff: Duration::from_secs(4),
        }
    }
}

/// Approximate sliding-window admission controller.
///
/// Tracks the instants of recently admitted requests, oldest first. Instants
/// older than the window are pruned on every check; a request is admitted as
/// soon as the pruned window has spare capacity. No burst smoothing and no
/// priority between callers. The instant list is mutex-guarded so concurrent
/// download workers can share one limiter.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a request may proceed, then record the admission instant.
    pub async fn admit(&self) {
        loop {
            {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();
                while admitted
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.config.interval)
                {
                    admitted.pop_front();
                }

                if admitted.len() < self.config.max_requests {
                    admitted.push_back(now);
                    return;
                }
                debug!(
                    "rate limit window full ({} requests), waiting {:?}",
                    admitted.len(),
                    self.config.backoff
                );
            }
            tokio::time::sleep(self.config.backoff).await;
        }
    }

    /// Number of admissions currently inside the window.
    pub async fn in_flight(&self) -> usize {
        let mut admitted = self.admitted.lock().await;
        let now = Instant::now();
        while admitted
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.config.interval)
        {
            admitted.pop_front();
        }
        admitted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_limiter(max_requests: usize, interval_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            interval: Duration::from_secs(interval_secs),
            backoff: Duration::from_millis(100),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_capacity_without_waiting() {
        let limiter = test_limiter(3, 60);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.admit().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.in_flight().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocks_when_window_is_full() {
        let limiter = test_limiter(2, 60);
        limiter.admit().await;
        limiter.admit().await;

        let start = Instant::now();
        limiter.admit().await;
        // Third admission has to outwait the window.
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_max_requests() {
        let limiter = test_limiter(5, 30);
        for _ in 0..12 {
            limiter.admit().await;
            assert!(limiter.in_flight().await <= 5);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_instants_free_capacity() {
        let limiter = test_limiter(2, 10);
        limiter.admit().await;
        limiter.admit().await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(limiter.in_flight().await, 0);

        let start = Instant::now();
        limiter.admit().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
