//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use tokio::sync::Mutex;

use laurel_engine::ReviewEngine;
use laurel_storage::MemoryStore;

use super::RATE_LIMIT_WINDOW_SECS;

/// Per-IP request tracker: (request count, window start time).
type IpTracker = HashMap<IpAddr, (u64, Instant)>;

/// In-memory per-IP rate limiter.
pub(crate) struct RateLimiter {
    /// Request counts per IP per window.
    tracker: Mutex<IpTracker>,
    /// Maximum requests per window.
    max_requests: u64,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            tracker: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Check if a request from the given IP is allowed.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;

        // Drop every expired window so the map tracks only active senders
        // instead of growing with each IP ever seen.
        tracker.retain(|_, (_, start)| now.duration_since(*start).as_secs() < RATE_LIMIT_WINDOW_SECS);

        let entry = tracker.entry(ip).or_insert((0, now));
        entry.0 += 1;
        if entry.0 > self.max_requests {
            let elapsed = now.duration_since(entry.1).as_secs();
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }
}

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// The review engine over the configured backend.
    pub(crate) engine: ReviewEngine<MemoryStore>,
    /// Per-IP rate limiter.
    pub(crate) rate_limiter: RateLimiter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[tokio::test]
    async fn requests_over_the_limit_are_rejected() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.check(ip(1)).await.is_ok());
        assert!(limiter.check(ip(1)).await.is_ok());
        assert!(limiter.check(ip(1)).await.is_err());
        // A different IP has its own budget.
        assert!(limiter.check(ip(2)).await.is_ok());
    }

    #[tokio::test]
    async fn expired_windows_are_evicted_not_kept_forever() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        for last in 1..=5 {
            assert!(limiter.check_at(ip(last), start).await.is_ok());
        }
        assert_eq!(limiter.tracker.lock().await.len(), 5);

        // One tick past the window: every stale entry goes, and the IP that
        // had exhausted its budget may send again.
        let later = start + Duration::from_secs(RATE_LIMIT_WINDOW_SECS + 1);
        assert!(limiter.check_at(ip(1), later).await.is_ok());
        assert_eq!(limiter.tracker.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn rate_limited_request_reports_retry_after_within_window() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start).await.is_ok());
        let retry_after = limiter
            .check_at(ip(1), start + Duration::from_secs(10))
            .await
            .unwrap_err();
        assert_eq!(retry_after, RATE_LIMIT_WINDOW_SECS - 10);
    }
}
