//! Request, retry and rate-limit metrics
//!
//! Uses the `metrics` facade, so every recording call is a cheap no-op until a
//! recorder is installed. [`init_metrics`] installs a Prometheus exporter with
//! an HTTP scrape endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Installed exporter address, if any
static METRICS_ADDR: Lazy<Mutex<Option<SocketAddr>>> = Lazy::new(|| Mutex::new(None));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize the Prometheus exporter
///
/// Idempotent: later calls are ignored once an exporter is installed.
///
/// # Arguments
/// * `addr` - Socket address for the scrape endpoint (e.g. "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut installed = METRICS_ADDR.lock().await;
    if let Some(existing) = *installed {
        debug!("Metrics already initialized on {}, skipping", existing);
        return Ok(());
    }

    info!("Initializing metrics exporter on {}", addr);
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "vantage_requests_total",
        Unit::Count,
        "HTTP attempts made to the market-data API"
    );
    describe_histogram!(
        "vantage_request_duration_seconds",
        Unit::Seconds,
        "Duration of single HTTP attempts"
    );
    describe_counter!(
        "vantage_retries_total",
        Unit::Count,
        "Retries scheduled after transport faults"
    );
    describe_histogram!(
        "vantage_retry_backoff_seconds",
        Unit::Seconds,
        "Backoff chosen before a retry"
    );
    describe_counter!(
        "vantage_rate_limit_signals_total",
        Unit::Count,
        "Rate-limit notices received inside successful responses"
    );
    describe_counter!(
        "vantage_terminal_failures_total",
        Unit::Count,
        "Requests that ended in an error, by fault kind"
    );
    describe_counter!(
        "vantage_filter_failures_total",
        Unit::Count,
        "CSV payloads that could not be date-filtered"
    );

    *installed = Some(addr);
    Ok(())
}

/// Whether [`init_metrics`] has installed an exporter
pub async fn is_initialized() -> bool {
    METRICS_ADDR.lock().await.is_some()
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one HTTP attempt
pub struct RequestMetrics {
    function: String,
    start_time: Instant,
    correlation_id: String,
}

impl RequestMetrics {
    /// Start timing an attempt for `function`
    pub fn start(function: impl Into<String>) -> Self {
        let function = function.into();
        let correlation_id = generate_correlation_id();
        debug!(correlation_id = %correlation_id, function = %function, "HTTP attempt started");
        Self {
            function,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record an attempt that produced an HTTP status
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();
        counter!(
            "vantage_requests_total",
            "function" => self.function.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!(
            "vantage_request_duration_seconds",
            "function" => self.function.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            function = %self.function,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP attempt completed"
        );
    }

    /// Record an attempt that failed before a status arrived
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();
        counter!(
            "vantage_requests_total",
            "function" => self.function.clone(),
            "status" => "network_error",
        )
        .increment(1);
        histogram!(
            "vantage_request_duration_seconds",
            "function" => self.function.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            function = %self.function,
            duration_ms = duration.as_millis() as u64,
            "HTTP attempt failed without response"
        );
    }

    /// Correlation ID of this attempt
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a scheduled retry and its backoff
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("vantage_retries_total", "attempt" => attempt.to_string()).increment(1);
    histogram!("vantage_retry_backoff_seconds").record(duration.as_secs_f64());
}

/// Record a vendor rate-limit notice
pub fn record_rate_limit_signal() {
    counter!("vantage_rate_limit_signals_total").increment(1);
}

/// Record a request that ended in an error of kind `label`
pub fn record_terminal_failure(label: &'static str) {
    counter!("vantage_terminal_failures_total", "kind" => label).increment(1);
}

/// Record a payload that could not be date-filtered
pub fn record_filter_failure() {
    counter!("vantage_filter_failures_total").increment(1);
}
