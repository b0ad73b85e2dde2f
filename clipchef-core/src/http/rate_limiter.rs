//! Per-host rate limiting for outgoing requests.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Spaces out requests to the same host so concurrent ingestions don't burst
/// a single platform CDN or API.
pub struct RateLimiter {
    min_delay: Duration,
    /// Next instant a request to each host may start.
    next_slot: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            next_slot: DashMap::new(),
        }
    }

    /// Reserve a slot for this host and sleep until it arrives.
    ///
    /// The slot is reserved under the map's entry lock, so two concurrent
    /// callers never receive the same slot.
    pub async fn wait(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        let now = Instant::now();
        let start = {
            let mut slot = self.next_slot.entry(host.to_string()).or_insert(now);
            let start = (*slot).max(now);
            *slot = start + self.min_delay;
            start
        };

        if start > now {
            sleep(start - now).await;
        }
    }

    /// Rate limit by the URL's host. URLs without a host are not limited.
    pub async fn wait_for_url(&self, url: &str) {
        if let Some(host) = super::host_of(url) {
            self.wait(&host).await;
        }
    }

    pub fn tracked_hosts(&self) -> usize {
        self.next_slot.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_limiter_tracks_nothing() {
        let limiter = RateLimiter::new(Duration::ZERO);
        limiter.wait_for_url("https://cdn.test/a").await;
        assert_eq!(limiter.tracked_hosts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_host_is_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let started = tokio::time::Instant::now();

        limiter.wait("cdn.test").await;
        limiter.wait("cdn.test").await;
        limiter.wait("other.test").await;

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(limiter.tracked_hosts(), 2);
    }
}
