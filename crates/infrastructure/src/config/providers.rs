//! Routing provider configuration.

use std::fmt;
use std::time::Duration;

use application::{ProviderQuota, RateLimiter, ThrottleRetryPolicy};
use domain::ProviderId;
use integration_routing::{DEFAULT_DIRECTIONS_BASE_URL, DEFAULT_HAFAS_BASE_URL, RoutingClientConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::default_true;

/// Wire format spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google-Directions-compatible API
    Directions,
    /// HAFAS via transport.rest
    Hafas,
}

impl ProviderKind {
    /// Endpoint used when `base_url` is not configured
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Directions => DEFAULT_DIRECTIONS_BASE_URL,
            Self::Hafas => DEFAULT_HAFAS_BASE_URL,
        }
    }

    /// Whether the provider refuses requests without a key
    #[must_use]
    pub const fn requires_api_key(self) -> bool {
        matches!(self, Self::Directions)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directions => write!(f, "directions"),
            Self::Hafas => write!(f, "hafas"),
        }
    }
}

/// One routing provider; providers are tried in configuration order
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderAppConfig {
    /// Unique identifier, also the budget ledger key
    pub id: String,

    /// Wire format
    pub kind: ProviderKind,

    /// Disabled providers are ignored entirely (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API base URL (defaults per kind)
    #[serde(default)]
    pub base_url: Option<String>,

    /// API credential (sensitive - uses `SecretString`)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// HTTP timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum spacing between requests in milliseconds (default: 500)
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Wait before the single retry after a throttle response (default: 2000)
    #[serde(default = "default_throttle_backoff_ms")]
    pub throttle_backoff_ms: u64,

    /// Send both party requests of a candidate at once (default: false)
    #[serde(default)]
    pub concurrent_requests: bool,

    /// Ask for alternative itineraries (default: false)
    #[serde(default)]
    pub alternatives: bool,

    /// Monthly allowance
    #[serde(default)]
    pub quota: ProviderQuota,
}

impl fmt::Debug for ProviderAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAppConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("min_interval_ms", &self.min_interval_ms)
            .field("throttle_backoff_ms", &self.throttle_backoff_ms)
            .field("concurrent_requests", &self.concurrent_requests)
            .field("alternatives", &self.alternatives)
            .field("quota", &self.quota)
            .finish()
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_min_interval_ms() -> u64 {
    500
}

const fn default_throttle_backoff_ms() -> u64 {
    2000
}

impl ProviderAppConfig {
    /// A provider of `kind` with default settings
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: true,
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            min_interval_ms: default_min_interval_ms(),
            throttle_backoff_ms: default_throttle_backoff_ms(),
            concurrent_requests: false,
            alternatives: false,
            quota: ProviderQuota::default(),
        }
    }

    /// The public HAFAS endpoint, usable without a key
    #[must_use]
    pub fn public_hafas() -> Self {
        Self::new("hafas", ProviderKind::Hafas)
    }

    /// Validated provider id
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a valid provider identifier.
    pub fn provider_id(&self) -> Result<ProviderId, String> {
        ProviderId::new(self.id.clone()).map_err(|e| format!("provider '{}': {e}", self.id))
    }

    /// Configuration for the integration client
    #[must_use]
    pub fn to_client_config(&self) -> RoutingClientConfig {
        RoutingClientConfig {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| self.kind.default_base_url().to_string()),
            api_key: self
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string()),
            timeout_secs: self.timeout_secs,
            alternatives: self.alternatives,
        }
    }

    /// Pacing and throttle-retry limiter for this provider
    #[must_use]
    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            Duration::from_millis(self.min_interval_ms),
            ThrottleRetryPolicy::single(Duration::from_millis(self.throttle_backoff_ms)),
        )
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.provider_id()?;

        if self.kind.requires_api_key()
            && self
                .api_key
                .as_ref()
                .is_none_or(|key| key.expose_secret().trim().is_empty())
        {
            return Err(format!(
                "provider '{}': {} providers require an api_key",
                self.id, self.kind
            ));
        }

        self.to_client_config()
            .validate()
            .map_err(|e| format!("provider '{}': {e}", self.id))?;

        self.quota
            .validate()
            .map_err(|e| format!("provider '{}': quota {e}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hafas_defaults() {
        let config = ProviderAppConfig::public_hafas();
        assert!(config.validate().is_ok());
        let client = config.to_client_config();
        assert_eq!(client.base_url, DEFAULT_HAFAS_BASE_URL);
        assert!(client.api_key.is_none());
        assert_eq!(config.rate_limiter().min_interval(), Duration::from_millis(500));
    }

    #[test]
    fn directions_requires_key() {
        let mut config = ProviderAppConfig::new("google", ProviderKind::Directions);
        assert!(config.validate().unwrap_err().contains("api_key"));

        config.api_key = Some(SecretString::from("abc".to_string()));
        assert!(config.validate().is_ok());
        assert_eq!(config.to_client_config().api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn invalid_id_rejected() {
        let config = ProviderAppConfig::new("Not Valid", ProviderKind::Hafas);
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_quota_and_key() {
        let config: ProviderAppConfig = serde_json::from_str(
            r#"{
                "id": "google",
                "kind": "directions",
                "api_key": "secret-value",
                "quota": {"kind": "free_tier", "free_requests": 100, "cost_per_request": 0.005, "monthly_cap": 10.0}
            }"#,
        )
        .unwrap();
        assert!(matches!(config.quota, ProviderQuota::FreeTier { free_requests: 100, .. }));
        assert_eq!(config.throttle_backoff_ms, 2000);
        assert!(config.enabled);
    }

    #[test]
    fn api_key_never_printed_or_serialized() {
        let mut config = ProviderAppConfig::new("google", ProviderKind::Directions);
        config.api_key = Some(SecretString::from("secret-value".to_string()));

        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-value"));
    }
}
