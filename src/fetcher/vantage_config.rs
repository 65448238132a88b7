//! Market-data vendor configuration
//!
//! Endpoint, credential source, client tag and the shared entitlement override.
//! Defaults target Alpha Vantage; every value can be overridden from the
//! environment or the CLI.

use std::sync::{Arc, RwLock};
use tracing::warn;

/// Default query endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

/// Client identification tag sent as the `source` parameter
pub const DEFAULT_SOURCE_TAG: &str = "trading_agents";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "ALPHA_VANTAGE_BASE_URL";

/// Environment variable seeding the entitlement override
pub const ENTITLEMENT_ENV: &str = "ALPHA_VANTAGE_ENTITLEMENT";

/// Process-wide entitlement used when a request carries none.
///
/// Cloning shares the same slot. Writes are rare and administrative; every
/// request takes a read lock.
#[derive(Debug, Clone, Default)]
pub struct EntitlementOverride {
    slot: Arc<RwLock<Option<String>>>,
}

impl EntitlementOverride {
    /// Create an override, optionally pre-set
    pub fn new(initial: Option<String>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(initial.filter(|e| !e.is_empty()))),
        }
    }

    /// Set the override. An empty string clears it.
    pub fn set(&self, entitlement: impl Into<String>) {
        let entitlement = entitlement.into();
        let value = (!entitlement.is_empty()).then_some(entitlement);
        match self.slot.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    /// Clear the override
    pub fn clear(&self) {
        match self.slot.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    /// Current override value
    pub fn get(&self) -> Option<String> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn!("Entitlement override lock poisoned, reading last value");
                poisoned.into_inner().clone()
            }
        }
    }
}

/// Configuration for the market-data transport
#[derive(Debug, Clone)]
pub struct VantageConfig {
    /// Query endpoint URL
    pub base_url: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// Value of the `source` query parameter
    pub source_tag: String,

    /// Entitlement used when a request carries none
    pub entitlement: EntitlementOverride,
}

impl Default for VantageConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            entitlement: EntitlementOverride::default(),
        }
    }
}

impl VantageConfig {
    /// Defaults overridden by `ALPHA_VANTAGE_BASE_URL` and `ALPHA_VANTAGE_ENTITLEMENT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = non_empty_env(BASE_URL_ENV) {
            config.base_url = url;
        }
        config.entitlement = EntitlementOverride::new(non_empty_env(ENTITLEMENT_ENV));
        config
    }

    /// Use a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Read the API key from a different environment variable
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    /// Use a different `source` tag
    pub fn with_source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = tag.into();
        self
    }

    /// Share an existing entitlement override
    pub fn with_entitlement(mut self, entitlement: EntitlementOverride) -> Self {
        self.entitlement = entitlement;
        self
    }

    /// Read the API key. `None` when unset or empty.
    pub fn api_key(&self) -> Option<String> {
        non_empty_env(&self.api_key_env)
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
