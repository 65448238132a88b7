//! Shared HTTP client for all transport instances
//!
//! `reqwest::Client` keeps a connection pool internally. Sharing one instance
//! lets concurrent callers reuse keep-alive connections to the vendor.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

/// HTTP connect timeout (seconds) - time to establish TCP connection
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds) - overall time for the entire request
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Global HTTP client shared by all transport instances
///
/// Falls back to a default client if the configured builder fails.
pub static GLOBAL_HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    build_http_client(
        Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS),
        Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
    )
    .unwrap_or_else(|e| {
        tracing::error!("Failed to build configured HTTP client: {}. Using defaults.", e);
        Client::new()
    })
});

/// Build an HTTP client with explicit timeouts
pub fn build_http_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
}

/// Get the global HTTP client
///
/// Returns a clone, which is cheap (the pool is behind an `Arc`)
pub fn global_http_client() -> Client {
    GLOBAL_HTTP_CLIENT.clone()
}
