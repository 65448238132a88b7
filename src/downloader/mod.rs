//! Retry orchestration and request throttling
//!
//! # Overview
//!
//! 1. **Policy**: retry budget and backoff shape in [`config::RetryPolicy`]
//! 2. **Execution**: [`executor::RetryController`] drives a [`crate::Transport`]
//! 3. **Throttling**: optional client-side quota via [`rate_limit::RateLimiter`]
//!
//! # Quick Start
//!
//! ```no_run
//! use vantage_dataflow::downloader::{RetryController, RetryPolicy};
//! use vantage_dataflow::fetcher::vantage_config::VantageConfig;
//! use vantage_dataflow::fetcher::vantage_http::VantageHttpClient;
//! use vantage_dataflow::RequestDescriptor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = RetryController::new(VantageHttpClient::from_config(VantageConfig::from_env()))
//!     .with_policy(RetryPolicy::default().with_max_retries(5));
//!
//! let payload = controller
//!     .fetch(&RequestDescriptor::new("GLOBAL_QUOTE").param("symbol", "IBM"))
//!     .await?;
//! println!("{}", payload.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - Transport faults are retried, then surfaced
//! - Rate-limit notices are surfaced at once so the caller can cool down
//! - Configuration and invalid-request faults are surfaced at once

pub mod config;
pub mod executor;
pub mod rate_limit;

pub use config::RetryPolicy;
pub use executor::RetryController;
pub use rate_limit::{RateLimitError, RateLimiter};
