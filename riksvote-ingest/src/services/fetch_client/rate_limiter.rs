//! Minimum-interval rate limiter
//!
//! Every upstream request passes through [`RateLimiter::wait`] before it is
//! sent, including retries and requests that end up empty or failing, so the
//! wall-clock cost of a stage is bounded below by `calls × min_interval`.
//!
//! Uses `tokio::time` so tests can drive it with a paused clock.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rate limiter enforcing a minimum interval between request starts
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait if necessary to comply with rate limit
    ///
    /// Returns how long this call was suspended.
    pub async fn wait(&self) -> Duration {
        let mut last = self.last_request.lock().await;
        let mut waited = Duration::ZERO;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", waited);
                tokio::time::sleep(waited).await;
            }
        }

        *last = Some(Instant::now());
        waited
    }
}
