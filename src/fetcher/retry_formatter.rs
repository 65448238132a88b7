//! Retry message formatting for the market-data client.
//!
//! Holds the transport fault classification and a [`RetryContext`] that renders
//! consistent retry and failure log messages, so a vendor outage can be
//! diagnosed from the logs alone.

use crate::{DateRange, RequestDescriptor};
use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Classification of transport faults for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request or connect timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 returned at the transport level
    HttpTooManyRequests,
    /// HTTP 5xx server error
    ServerError(u16),
    /// HTTP 4xx other than 429
    ClientError(u16),
    /// Response body could not be read to completion
    BodyRead,
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::HttpTooManyRequests => "too many requests (429)",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                401 | 403 => "request rejected",
                404 => "endpoint not found",
                _ => "client error",
            },
            Self::BodyRead => "response body interrupted",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation presented after the retry budget is exhausted.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::HttpTooManyRequests => "Reduce request rate or wait for the quota window to reset",
            Self::ServerError(_) => "The data vendor may be experiencing issues, try again later",
            Self::ClientError(_) => "Review the function name and request parameters",
            Self::BodyRead => "The connection dropped mid-response, try again later",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }

    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "timeout",
            Self::NetworkOffline => "connect",
            Self::HttpTooManyRequests => "http_429",
            Self::ServerError(_) => "http_5xx",
            Self::ClientError(_) => "http_4xx",
            Self::BodyRead => "body",
            Self::NetworkGeneric => "network",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Total attempts allowed (retries + 1)
    pub max_attempts: u32,
    /// Classification of the fault that triggered the retry
    pub error_type: RetryErrorType,
    /// Backoff duration until next attempt
    pub backoff_duration: Duration,
    /// Request label, e.g. `TIME_SERIES_DAILY (IBM)`
    pub request: String,
    /// Date range requested by the caller, if any
    pub date_range: Option<DateRange>,
    /// Original error message for details
    pub error_message: String,
    /// URL that failed
    pub endpoint: String,
}

impl RetryContext {
    /// Build a context for `request` at the given attempt.
    pub fn new(
        request: &RequestDescriptor,
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        error_message: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration: Duration::ZERO,
            request: request.to_string(),
            date_range: None,
            error_message: error_message.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Attach the backoff chosen for the next attempt
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff_duration = backoff;
        self
    }

    /// Attach the caller's date range
    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.2} seconds...",
            self.attempt + 1,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        self.append_request(&mut message);
        message
    }

    /// Format retry success message when a previous attempt eventually works.
    pub fn format_success(&self) -> String {
        let mut message = format!(
            "Attempt {}/{} succeeded after retry",
            self.attempt, self.max_attempts
        );
        self.append_request(&mut message);
        message
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Request failed after {} attempts", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Request: {}", self.request),
        ];
        if let Some(range) = self.date_range {
            lines.push(format!("  Date range: {range}"));
        }
        lines.push(format!("  Endpoint: {}", self.endpoint));
        lines.push("  Suggestions:".to_string());
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }
        lines.join("\n")
    }

    /// Derive suggestions tailored to the current retry context.
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts.saturating_sub(1)
            ),
        ]
    }

    fn append_request(&self, buffer: &mut String) {
        buffer.push_str(&format!(" ({})", self.request));
        if let Some(range) = self.date_range {
            buffer.push_str(&format!(" {range}"));
        }
    }
}

/// Extract a [`RetryErrorType`] from an HTTP status or reqwest error.
pub fn extract_error_type(
    status: Option<StatusCode>,
    err: Option<&ReqwestError>,
) -> RetryErrorType {
    if let Some(status) = status {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return RetryErrorType::HttpTooManyRequests;
        }
        if status.is_server_error() {
            return RetryErrorType::ServerError(status.as_u16());
        }
        if status.is_client_error() {
            return RetryErrorType::ClientError(status.as_u16());
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return RetryErrorType::NetworkTimeout;
        }
        if err.is_connect() {
            return RetryErrorType::NetworkOffline;
        }
        if err.is_body() || err.is_decode() {
            return RetryErrorType::BodyRead;
        }
    }

    RetryErrorType::NetworkGeneric
}
