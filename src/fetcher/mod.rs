//! Transport layer for the market-data API
//!
//! A [`Transport`] performs exactly one attempt per call and classifies the
//! outcome into a payload or a tagged [`FetcherError`]. Retrying is left to
//! [`crate::downloader::RetryController`].

use crate::output::FilterError;
use crate::{ApiPayload, RequestDescriptor};
use async_trait::async_trait;
use std::fmt;

pub mod params;
pub mod retry_formatter;
pub mod shared_resources;
pub mod vantage_config;
pub mod vantage_http;

use retry_formatter::RetryErrorType;

/// Network-level failure of a single attempt: connect error, timeout,
/// non-2xx status or a body that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    /// Classification used for retry messages and metrics
    pub kind: RetryErrorType,
    /// Underlying error text
    pub message: String,
}

impl TransportFault {
    /// Create a transport fault
    pub fn new(kind: RetryErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)
    }
}

/// Fetcher errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetcherError {
    /// Missing or invalid credential/configuration. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network/OS-level or HTTP status failure. The only retryable kind.
    #[error("transport error: {0}")]
    Transport(TransportFault),

    /// Vendor reported quota or key exhaustion inside a successful response
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        /// Vendor's notice text
        message: String,
    },

    /// Request could not be built (bad URL, bad parameters)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Payload could not be post-processed under a strict filter policy
    #[error("post-processing error: {0}")]
    PostProcess(FilterError),
}

impl FetcherError {
    /// Whether the retry controller may try again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetcherError::Transport(_))
    }

    /// Whether this is a vendor rate-limit signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetcherError::RateLimited { .. })
    }

    /// Short label used for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            FetcherError::Configuration(_) => "configuration",
            FetcherError::Transport(_) => "transport",
            FetcherError::RateLimited { .. } => "rate_limited",
            FetcherError::InvalidRequest(_) => "invalid_request",
            FetcherError::Cancelled => "cancelled",
            FetcherError::PostProcess(_) => "post_process",
        }
    }
}

impl From<TransportFault> for FetcherError {
    fn from(fault: TransportFault) -> Self {
        FetcherError::Transport(fault)
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// A single-attempt transport to the market-data API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one attempt for `request`
    ///
    /// # Errors
    /// Returns a classified [`FetcherError`]; implementations must not retry.
    async fn execute(&self, request: &RequestDescriptor) -> FetcherResult<ApiPayload>;

    /// Endpoint used for log context
    fn endpoint(&self) -> &str;
}
