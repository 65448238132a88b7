//! Retry policy and backoff calculation

use rand::Rng;
use std::time::Duration;

/// Maximum number of retries after the first attempt (4 attempts in total).
pub const MAX_RETRIES: u32 = 3;

/// Base backoff delay. Doubles on every retry.
pub const BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Upper bound for a single backoff delay, jitter included.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Jitter is drawn uniformly from `[0, JITTER_FRACTION * delay]`.
pub const JITTER_FRACTION: f64 = 0.1;

/// Retry budget and backoff shape for the retry controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (before jitter)
    pub base_delay: Duration,
    /// Upper bound for any delay
    pub max_delay: Duration,
    /// Maximum jitter as a fraction of the computed delay
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: BASE_BACKOFF,
            max_delay: MAX_BACKOFF,
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

impl RetryPolicy {
    /// Override the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Override the delay cap
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Total attempts allowed
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (1-based), jitter not applied
    pub fn base_backoff(&self, retry: u32) -> Duration {
        calculate_backoff(self.base_delay, self.max_delay, retry)
    }

    /// Delay before retry `retry` (1-based) with a random jitter sample
    pub fn backoff_with_jitter(&self, retry: u32) -> Duration {
        let sample = rand::thread_rng().gen_range(0.0..=1.0);
        self.backoff_with_sample(retry, sample)
    }

    /// Delay before retry `retry` given a jitter sample in `[0, 1]`.
    ///
    /// The result is clamped to `max_delay`, which keeps the sequence
    /// non-decreasing once the cap is reached.
    pub fn backoff_with_sample(&self, retry: u32, sample: f64) -> Duration {
        let delay = self.base_backoff(retry);
        let jitter = delay.mul_f64(self.jitter_fraction * sample.clamp(0.0, 1.0));
        (delay + jitter).min(self.max_delay)
    }
}

/// Exponential backoff `base * 2^(retry - 1)` capped at `max`
pub fn calculate_backoff(base: Duration, max: Duration, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent)
        .unwrap_or(max)
        .min(max)
}
