//! HTTP transport for the market-data query API
//!
//! Performs one authenticated GET per call and classifies the response:
//! - non-2xx status, connect errors and timeouts become transport faults
//! - JSON bodies carrying a quota or key notice in `Information` become rate-limit faults
//! - everything else is returned unchanged as the payload

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::fetcher::retry_formatter::extract_error_type;
use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::vantage_config::{EntitlementOverride, VantageConfig};
use crate::fetcher::{FetcherError, FetcherResult, Transport, TransportFault};
use crate::metrics::RequestMetrics;
use crate::{ApiPayload, RequestDescriptor, ENTITLEMENT_PARAM};

/// JSON field the vendor uses for notices delivered with HTTP 200
pub const INFORMATION_FIELD: &str = "Information";

/// Lowercase markers identifying a quota or key notice
const RATE_LIMIT_MARKERS: [&str; 2] = ["rate limit", "api key"];

/// Maximum number of body bytes quoted in error messages
const ERROR_BODY_PREVIEW: usize = 200;

/// Query keys injected by the transport; caller values for these are replaced
const INJECTED_KEYS: [&str; 4] = ["function", "apikey", "source", ENTITLEMENT_PARAM];

/// Authenticated single-attempt client for the market-data API
#[derive(Debug, Clone)]
pub struct VantageHttpClient {
    client: Client,
    config: VantageConfig,
}

impl VantageHttpClient {
    /// Create a transport with an explicit HTTP client
    ///
    /// # Arguments
    /// * `client` - HTTP client (cheap to clone, shares its connection pool)
    /// * `config` - Endpoint, credential source, tag and entitlement override
    pub fn new(client: Client, config: VantageConfig) -> Self {
        Self { client, config }
    }

    /// Create a transport on the shared global HTTP client
    pub fn from_config(config: VantageConfig) -> Self {
        Self::new(global_http_client(), config)
    }

    /// Active configuration
    pub fn config(&self) -> &VantageConfig {
        &self.config
    }

    /// Handle for the administrative entitlement override
    pub fn entitlement_override(&self) -> &EntitlementOverride {
        &self.config.entitlement
    }

    /// Entitlement sent with `request`: the request's own value, else the override
    pub fn resolve_entitlement(&self, request: &RequestDescriptor) -> Option<String> {
        request
            .requested_entitlement()
            .map(str::to_string)
            .or_else(|| self.config.entitlement.get())
    }

    /// Compose the outgoing query for `request`.
    ///
    /// The descriptor is left untouched; injected keys replace caller values
    /// with the same name, and `entitlement` is omitted entirely when unresolved.
    pub fn build_query(&self, request: &RequestDescriptor, api_key: &str) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(request.params().len() + INJECTED_KEYS.len());
        query.push(("function".to_string(), request.function().to_string()));
        query.extend(
            request
                .params()
                .iter()
                .filter(|(key, _)| !INJECTED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        query.push(("apikey".to_string(), api_key.to_string()));
        query.push(("source".to_string(), self.config.source_tag.clone()));

        if let Some(entitlement) = self.resolve_entitlement(request) {
            query.push((ENTITLEMENT_PARAM.to_string(), entitlement));
        }
        query
    }

    fn api_key(&self) -> FetcherResult<String> {
        self.config.api_key().ok_or_else(|| {
            FetcherError::Configuration(format!(
                "{} environment variable is not set",
                self.config.api_key_env
            ))
        })
    }
}

#[async_trait]
impl Transport for VantageHttpClient {
    async fn execute(&self, request: &RequestDescriptor) -> FetcherResult<ApiPayload> {
        let api_key = self.api_key()?;
        let query = self.build_query(request, &api_key);

        debug!(
            function = request.function(),
            params = query.len(),
            "Sending GET to {}",
            self.config.base_url
        );

        let request_metrics = RequestMetrics::start(request.function());
        let response = match self.client.get(&self.config.base_url).query(&query).send().await {
            Ok(resp) => resp,
            Err(e) => {
                request_metrics.record_network_error();
                return Err(classify_send_error(e));
            }
        };

        let status = response.status();
        request_metrics.record_complete(status.as_u16());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportFault::new(
                extract_error_type(Some(status), None),
                format!("HTTP {}: {}", status, preview(&body)),
            )
            .into());
        }

        let body = response.text().await.map_err(|e| {
            let e = e.without_url();
            TransportFault::new(extract_error_type(None, Some(&e)), e.to_string())
        })?;

        let payload = classify_body(body)?;
        debug!(
            function = request.function(),
            json = payload.is_json(),
            bytes = payload.text().len(),
            "Response received"
        );
        Ok(payload)
    }

    fn endpoint(&self) -> &str {
        &self.config.base_url
    }
}

/// Classify a 2xx body into a payload or a rate-limit fault.
///
/// JSON is tried first; a body that is not JSON is the normal CSV path.
pub fn classify_body(body: String) -> FetcherResult<ApiPayload> {
    let value = match serde_json::from_str::<Value>(&body) {
        Ok(value) => value,
        Err(_) => return Ok(ApiPayload::Text(body)),
    };

    if let Some(message) = rate_limit_notice(&value) {
        crate::metrics::record_rate_limit_signal();
        return Err(FetcherError::RateLimited {
            message: message.to_string(),
        });
    }

    Ok(ApiPayload::Json { value, raw: body })
}

/// Vendor notice text when `value` is a quota or key notice
pub fn rate_limit_notice(value: &Value) -> Option<&str> {
    let message = value.get(INFORMATION_FIELD)?.as_str()?;
    let lowered = message.to_lowercase();
    RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        .then_some(message)
}

/// Map a send failure. URLs are stripped because the query carries the API key.
fn classify_send_error(err: reqwest::Error) -> FetcherError {
    let err = err.without_url();
    if err.is_builder() {
        return FetcherError::InvalidRequest(err.to_string());
    }
    TransportFault::new(extract_error_type(None, Some(&err)), err.to_string()).into()
}

fn preview(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}
