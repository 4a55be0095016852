//! Routing client configuration

use serde::{Deserialize, Serialize};

/// Default Directions API endpoint
pub const DEFAULT_DIRECTIONS_BASE_URL: &str = "https://maps.googleapis.com/maps/api/directions";

/// Default HAFAS endpoint (transport.rest)
pub const DEFAULT_HAFAS_BASE_URL: &str = "https://v6.db.transport.rest";

/// Configuration shared by all routing clients
#[derive(Clone, Serialize, Deserialize)]
pub struct RoutingClientConfig {
    /// Base URL of the provider API
    pub base_url: String,

    /// API credential (sent as a query parameter, never logged)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask the provider for alternative itineraries
    #[serde(default)]
    pub alternatives: bool,
}

impl std::fmt::Debug for RoutingClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingClientConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    Some("[REDACTED]")
                } else {
                    None
                },
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("alternatives", &self.alternatives)
            .finish()
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

impl Default for RoutingClientConfig {
    fn default() -> Self {
        Self::directions(None)
    }
}

impl RoutingClientConfig {
    /// Configuration for the Directions API
    #[must_use]
    pub fn directions(api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_DIRECTIONS_BASE_URL.to_string(),
            api_key,
            timeout_secs: default_timeout_secs(),
            alternatives: false,
        }
    }

    /// Configuration for the public HAFAS endpoint
    #[must_use]
    pub fn hafas() -> Self {
        Self {
            base_url: DEFAULT_HAFAS_BASE_URL.to_string(),
            ..Self::directions(None)
        }
    }

    /// Create a configuration suitable for testing against a mock server
    #[must_use]
    pub fn for_testing(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
            alternatives: false,
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("base_url must be an http(s) URL, got '{}'", self.base_url));
        }

        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }

        if self.api_key.as_deref().is_some_and(str::is_empty) {
            return Err("api_key must not be empty when set".to_string());
        }

        Ok(())
    }

    pub(crate) fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
