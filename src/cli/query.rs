//! Query and filter command implementations

use crate::downloader::{RateLimiter, RetryController};
use crate::fetcher::vantage_config::{VantageConfig, DEFAULT_SOURCE_TAG};
use crate::fetcher::vantage_http::VantageHttpClient;
use crate::output::date_filter::{filter_by_range, parse_bounds};
use crate::output::FilterPolicy;
use crate::shutdown::SharedCancel;
use crate::{DateRange, RequestDescriptor};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use super::CliError;

/// Parse a `key=value` query parameter
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter '{s}': expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid parameter '{s}': empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Market-data query CLI
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(about = "Query a market-data API with retries and date filtering", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Maximum number of retries after transport faults (default: 3, range: 0-10)
    #[arg(long, global = true, default_value = "3", value_parser = clap::value_parser!(u32).range(0..=10))]
    pub max_retries: u32,

    /// Query endpoint (default: https://www.alphavantage.co/query)
    #[arg(long, global = true, env = "ALPHA_VANTAGE_BASE_URL")]
    pub base_url: Option<String>,

    /// Client identification tag sent as the `source` parameter
    #[arg(long, global = true, default_value = DEFAULT_SOURCE_TAG)]
    pub source_tag: String,

    /// What to do with CSV that cannot be date-filtered: fail-open or strict
    #[arg(long, global = true, default_value = "fail-open")]
    pub filter_policy: FilterPolicy,

    /// Client-side request budget per minute (unlimited when omitted)
    #[arg(long, global = true)]
    pub requests_per_minute: Option<usize>,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Call an API function and print the payload
    Query(QueryArgs),

    /// Filter a local CSV time series by date range
    Filter(FilterArgs),
}

/// Arguments for `vantage query`
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// API function name (e.g. TIME_SERIES_DAILY)
    pub function: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Keep rows dated on or after this day (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Keep rows dated on or before this day (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Request-level entitlement (overrides ALPHA_VANTAGE_ENTITLEMENT)
    #[arg(long)]
    pub entitlement: Option<String>,
}

impl QueryArgs {
    /// Build the request descriptor from the arguments
    pub fn request(&self) -> RequestDescriptor {
        let request = self
            .params
            .iter()
            .fold(RequestDescriptor::new(&self.function), |request, (key, value)| {
                request.param(key.as_str(), value)
            });
        match &self.entitlement {
            Some(entitlement) => request.entitlement(entitlement.as_str()),
            None => request,
        }
    }

    /// Date range requested, if both bounds were given
    pub fn date_range(&self) -> Result<Option<DateRange>, CliError> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => parse_bounds(start, end)
                .map(Some)
                .map_err(|e| CliError::InvalidArgument(e.to_string())),
            _ => Ok(None),
        }
    }

    /// Run the query and return the (possibly filtered) payload text
    pub async fn execute(&self, cli: &Cli, cancel: SharedCancel) -> Result<String, CliError> {
        let range = self.date_range()?;
        let request = self.request();

        let mut config = VantageConfig::from_env().with_source_tag(cli.source_tag.as_str());
        if let Some(base_url) = &cli.base_url {
            config = config.with_base_url(base_url.as_str());
        }

        let mut controller = RetryController::new(VantageHttpClient::from_config(config))
            .with_max_retries(cli.max_retries)
            .with_filter_policy(cli.filter_policy)
            .with_cancel(cancel);
        if let Some(limit) = cli.requests_per_minute {
            controller = controller.with_rate_limiter(RateLimiter::per_minute(limit));
        }

        info!(request = %request, range = ?range, "Querying market data");
        let text = controller.fetch_csv(&request, range.as_ref()).await?;
        Ok(text)
    }
}

/// Arguments for `vantage filter`
#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// CSV file to filter, or `-` for stdin
    pub input: PathBuf,

    /// Keep rows dated on or after this day (YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Keep rows dated on or before this day (YYYY-MM-DD)
    #[arg(long)]
    pub end: String,
}

impl FilterArgs {
    /// Read the input and return the filtered CSV text
    pub fn execute(&self, cli: &Cli) -> Result<String, CliError> {
        let csv_data = self.read_input()?;

        let range = match parse_bounds(&self.start, &self.end) {
            Ok(range) => range,
            Err(e) => match cli.filter_policy {
                FilterPolicy::Strict => return Err(e.into()),
                FilterPolicy::FailOpen => {
                    tracing::warn!(error = %e, "Invalid date bounds, returning unfiltered data");
                    return Ok(csv_data);
                }
            },
        };

        Ok(filter_by_range(&csv_data, &range, cli.filter_policy)?)
    }

    fn read_input(&self) -> Result<String, CliError> {
        if self.input.as_os_str() == "-" {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| CliError::IoError(format!("Failed to read stdin: {e}")))?;
            return Ok(buffer);
        }

        std::fs::read_to_string(&self.input).map_err(|e| {
            CliError::IoError(format!("Failed to read {}: {e}", self.input.display()))
        })
    }
}
