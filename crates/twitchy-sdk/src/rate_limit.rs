//! Helix rate-limit bookkeeping
//!
//! Helix reports the remaining request budget and the time it refills on
//! every response. When the budget is exhausted the client waits for the
//! refill before dispatching again.

use chrono::Utc;
use reqwest::header::HeaderMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Remaining requests in the current window
pub const RATELIMIT_REMAINING_HEADER: &str = "Ratelimit-Remaining";

/// Unix timestamp (seconds) at which the window refills
pub const RATELIMIT_RESET_HEADER: &str = "Ratelimit-Reset";

/// Slack added on top of the advertised reset time
const RESET_SLACK: Duration = Duration::from_millis(100);

/// Pause after a 429 that carried no usable reset time
pub const RATE_LIMITED_BACKOFF: Duration = Duration::from_millis(500);

/// Last rate-limit values reported by Helix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub remaining: Option<u32>,
    pub reset_at: Option<i64>,
}

impl RateLimitSnapshot {
    /// How long to wait at unix time `now` before the next request
    pub fn wait_at(&self, now: i64) -> Option<Duration> {
        if self.remaining != Some(0) {
            return None;
        }

        let reset_at = self.reset_at?;
        if reset_at <= now {
            return None;
        }

        let secs = u64::try_from(reset_at - now).ok()?;
        Some(Duration::from_secs(secs) + RESET_SLACK)
    }
}

/// Shared rate-limit state for one client
#[derive(Debug)]
pub struct RateLimitTracker {
    snapshot: Mutex<RateLimitSnapshot>,
    max_wait: Duration,
}

impl RateLimitTracker {
    pub fn new(max_wait: Duration) -> Self {
        Self {
            snapshot: Mutex::new(RateLimitSnapshot::default()),
            max_wait,
        }
    }

    /// Store the values of a response's rate-limit headers; absent or
    /// malformed headers leave the previous values in place
    pub async fn record(&self, headers: &HeaderMap) {
        let remaining = header_number::<u32>(headers, RATELIMIT_REMAINING_HEADER);
        let reset_at = header_number::<i64>(headers, RATELIMIT_RESET_HEADER);

        if remaining.is_none() && reset_at.is_none() {
            return;
        }

        let mut snapshot = self.snapshot.lock().await;
        if remaining.is_some() {
            snapshot.remaining = remaining;
        }
        if reset_at.is_some() {
            snapshot.reset_at = reset_at;
        }
    }

    pub async fn snapshot(&self) -> RateLimitSnapshot {
        *self.snapshot.lock().await
    }

    /// Wait for the window to refill if the budget is exhausted, capped by
    /// the configured maximum
    pub async fn wait_for_reset(&self) {
        let wait = self.snapshot().await.wait_at(Utc::now().timestamp());

        if let Some(wait) = wait {
            let wait = wait.min(self.max_wait);
            debug!("Rate limit exhausted, waiting {:?} for reset", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Wait after Helix answered 429: until the advertised reset, or for
    /// [`RATE_LIMITED_BACKOFF`] when the headers give no future reset
    pub async fn wait_after_rejection(&self) {
        let wait = self
            .snapshot()
            .await
            .wait_at(Utc::now().timestamp())
            .unwrap_or(RATE_LIMITED_BACKOFF)
            .min(self.max_wait);

        debug!("Rate limited, waiting {:?} before retrying", wait);
        tokio::time::sleep(wait).await;
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
