//! Integration tests for logging and tracing

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;
use vantage_dataflow::downloader::{RetryController, RetryPolicy};
use vantage_dataflow::fetcher::vantage_config::VantageConfig;
use vantage_dataflow::fetcher::vantage_http::VantageHttpClient;
use vantage_dataflow::RequestDescriptor;

use crate::support::stub_server::{api_key_env, daily_csv, StubResponse, StubServer};

/// Writer that collects formatted log output in memory
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn test_tracing_subscriber_initialization() {
    let result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vantage_dataflow=debug")),
        )
        .with_test_writer()
        .try_init();

    // Another test may have installed the global subscriber first.
    assert!(result.is_ok() || result.is_err());
}

#[test]
fn test_env_filter_directives_parse() {
    for directive in [
        "info",
        "vantage_dataflow=debug",
        "warn,vantage_dataflow::downloader=trace",
        "vantage=info,vantage_dataflow=info",
    ] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}

#[tokio::test]
async fn test_retry_attempts_are_logged() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("vantage_dataflow=debug"))
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = StubServer::start(vec![
        StubResponse::Status(503, "down".into()),
        StubResponse::Ok(daily_csv(1, 2)),
    ])
    .await;
    let config = VantageConfig::default()
        .with_base_url(server.url())
        .with_api_key_env(api_key_env("logging_retry"));
    let controller = RetryController::new(VantageHttpClient::new(Client::new(), config))
        .with_policy(RetryPolicy::default().with_base_delay(Duration::from_millis(5)));

    controller
        .fetch(&RequestDescriptor::new("TIME_SERIES_DAILY").param("symbol", "IBM"))
        .await
        .unwrap();

    let output = logs.contents();
    assert!(output.contains("Retrying (attempt 2/4)"), "{output}");
    assert!(output.contains("service unavailable"), "{output}");
    assert!(output.contains("TIME_SERIES_DAILY (IBM)"), "{output}");
    assert!(output.contains("succeeded after retry"), "{output}");
    assert!(!output.contains("test-key"), "API key leaked into logs: {output}");
}

#[tokio::test]
async fn test_exhausted_budget_logs_failure_summary() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("vantage_dataflow=info"))
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let server = StubServer::start(vec![StubResponse::Status(500, "boom".into())]).await;
    let config = VantageConfig::default()
        .with_base_url(server.url())
        .with_api_key_env(api_key_env("logging_failure"));
    let controller = RetryController::new(VantageHttpClient::new(Client::new(), config))
        .with_policy(
            RetryPolicy::default()
                .with_max_retries(1)
                .with_base_delay(Duration::from_millis(5)),
        );

    assert!(controller.fetch(&RequestDescriptor::new("GLOBAL_QUOTE")).await.is_err());

    let output = logs.contents();
    assert!(output.contains("[FAILED] Request failed after 2 attempts"), "{output}");
    assert!(output.contains("--max-retries"), "{output}");
}

#[test]
fn test_tracing_json_format() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(logs.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(function = "OVERVIEW", attempt = 1, "Querying market data");
    });

    let line = logs.contents();
    let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(value["fields"]["message"], "Querying market data");
    assert_eq!(value["fields"]["function"], "OVERVIEW");
}
