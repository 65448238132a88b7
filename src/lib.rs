//! # Vantage Dataflow
//!
//! A resilient client for rate-limited market-data query APIs (Alpha Vantage style
//! `GET /query?function=...`). Designed as the data layer for trading-decision
//! pipelines that need vendor data without caring about vendor flakiness.
//!
//! ## Features
//!
//! - **Typed faults**: configuration, transport, rate-limit, invalid request and cancellation
//! - **Retry with backoff**: exponential backoff with jitter, transport faults only
//! - **Rate-limit detection**: vendor quota notices embedded in HTTP 200 bodies
//! - **Entitlement handling**: per-request value with a shared, thread-safe override
//! - **Date filtering**: inclusive date-range filtering of CSV time series, fail-open by default
//!
//! ## Quick Start
//!
//! ```no_run
//! use vantage_dataflow::downloader::RetryController;
//! use vantage_dataflow::fetcher::vantage_http::VantageHttpClient;
//! use vantage_dataflow::fetcher::vantage_config::VantageConfig;
//! use vantage_dataflow::{DateRange, RequestDescriptor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = VantageHttpClient::from_config(VantageConfig::from_env());
//! let controller = RetryController::new(transport);
//!
//! let request = RequestDescriptor::new("TIME_SERIES_DAILY_ADJUSTED")
//!     .param("symbol", "NVDA")
//!     .param("outputsize", "full")
//!     .param("datatype", "csv");
//! let range = DateRange::parse("2024-05-01", "2024-05-10")?;
//!
//! let csv = controller.fetch_csv(&request, Some(&range)).await?;
//! println!("{csv}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Transport layer: request composition, single HTTP attempt, classification
//! - [`downloader`] - Retry controller, backoff policy and optional request throttling
//! - [`output`] - CSV post-processing (date-range filter)
//! - [`shutdown`] - Cancellation signal shared between callers and in-flight requests
//! - [`metrics`] - Request, retry and rate-limit metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// CLI command implementations
pub mod cli;

/// Retry orchestration and request throttling
pub mod downloader;

/// Transport layer for the market-data API
pub mod fetcher;

/// Request, retry and rate-limit metrics
pub mod metrics;

/// Payload post-processing
pub mod output;

/// Cancellation coordination shared across requests
pub mod shutdown;

pub use downloader::RetryController;
pub use fetcher::{FetcherError, FetcherResult, Transport};
pub use output::date_filter::filter_csv_by_date_range;

/// Query parameter key carrying the request-level entitlement.
pub const ENTITLEMENT_PARAM: &str = "entitlement";

/// One vendor API call: endpoint function plus its parameters.
///
/// Built once and never mutated by the transport layer. Builder methods consume
/// and return `Self`, so a shared descriptor can be reused across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    function: String,
    params: BTreeMap<String, String>,
    entitlement: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor for the given API function (e.g. `TIME_SERIES_DAILY`)
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            params: BTreeMap::new(),
            entitlement: None,
        }
    }

    /// Add a query parameter. Numbers are stored as their string rendering.
    ///
    /// A parameter named `entitlement` sets the request-level entitlement
    /// instead of becoming a plain parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        if key == ENTITLEMENT_PARAM {
            self.entitlement = Some(value);
        } else {
            self.params.insert(key, value);
        }
        self
    }

    /// Set the request-level entitlement
    pub fn entitlement(self, entitlement: impl Into<String>) -> Self {
        self.param(ENTITLEMENT_PARAM, entitlement.into())
    }

    /// API function name
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Caller-supplied parameters, ordered by key
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Request-level entitlement. Empty strings count as unset.
    pub fn requested_entitlement(&self) -> Option<&str> {
        self.entitlement.as_deref().filter(|e| !e.is_empty())
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function)?;
        if let Some(symbol) = self.params.get("symbol") {
            write!(f, " ({symbol})")?;
        }
        Ok(())
    }
}

/// Inclusive calendar date range used to filter time-series payloads.
///
/// `start <= end` is not validated; an inverted range simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date included
    pub start: NaiveDate,
    /// Last date included
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range from two dates
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parse a range from two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start: NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")?,
            end: NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")?,
        })
    }

    /// Whether `date` lies within the range, bounds included
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Body returned by a successful transport attempt.
///
/// The body is classified once: either it decoded as JSON or it is opaque text
/// (typically CSV). The original text is always kept unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    /// Body decoded as JSON without a rate-limit notice
    Json {
        /// Decoded value
        value: serde_json::Value,
        /// Body text as received
        raw: String,
    },
    /// Body that is not JSON (CSV and friends)
    Text(String),
}

impl ApiPayload {
    /// Body text exactly as received
    pub fn text(&self) -> &str {
        match self {
            ApiPayload::Json { raw, .. } => raw,
            ApiPayload::Text(raw) => raw,
        }
    }

    /// Consume the payload and return the body text
    pub fn into_text(self) -> String {
        match self {
            ApiPayload::Json { raw, .. } => raw,
            ApiPayload::Text(raw) => raw,
        }
    }

    /// Decoded JSON value, if the body was JSON
    pub fn json(&self) -> Option<&serde_json::Value> {
        match self {
            ApiPayload::Json { value, .. } => Some(value),
            ApiPayload::Text(_) => None,
        }
    }

    /// Whether the body decoded as JSON
    pub fn is_json(&self) -> bool {
        matches!(self, ApiPayload::Json { .. })
    }
}
