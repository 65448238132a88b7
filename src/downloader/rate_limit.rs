//! Client-side request throttling
//!
//! Free vendor tiers allow only a handful of requests per minute. A shared
//! [`RateLimiter`] keeps concurrent callers under that quota before the vendor
//! has to answer with a rate-limit notice.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Sliding-window request limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allow `max_requests` requests per `window`
    ///
    /// # Arguments
    /// * `max_requests` - Requests allowed in any window (at least 1)
    /// * `window` - Length of the window
    pub fn per_window(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_requests)),
            max_requests,
            window,
        }
    }

    /// Allow `max_requests` requests per minute
    pub fn per_minute(max_requests: usize) -> Self {
        Self::per_window(max_requests, Duration::from_secs(60))
    }

    /// Requests allowed per window
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a request slot.
    ///
    /// The permit is held for the full window so at most `max_requests`
    /// requests start in any window.
    pub async fn acquire(&self) -> Result<Duration, RateLimitError> {
        let started = Instant::now();
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        let waited = started.elapsed();
        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "Throttled before request");
        }

        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            drop(permit);
        });

        Ok(waited)
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire permits
    #[error("failed to acquire rate limit permit: {0}")]
    AcquireError(String),
}
