//! Application configuration
//!
//! Split into focused sub-modules:
//! - `engine`: scoring weights and candidate generation
//! - `providers`: routing providers, credentials, pacing and quotas
//! - `hubs`: extra hub catalog entries
//! - `database`: SQLite budget persistence
//! - `logging`: log filter and format
//!
//! Sources are layered: defaults, then an optional `rendezvous.toml` (or an
//! explicit file), then `RENDEZVOUS_*` environment variables with `__`
//! separating nested keys (e.g. `RENDEZVOUS_ENGINE__FAIRNESS_WEIGHT=2.8`).

mod database;
mod engine;
mod hubs;
mod logging;
mod providers;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use database::DatabaseConfig;
pub use engine::EngineAppConfig;
pub use hubs::HubAppConfig;
pub use logging::LoggingConfig;
pub use providers::{ProviderAppConfig, ProviderKind};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "rendezvous";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RENDEZVOUS";

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Application environment (development or production)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Production environment
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!(
                "Invalid environment: {s}. Use 'development' or 'production'"
            )),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment
    #[serde(default)]
    pub environment: Option<Environment>,

    /// Resolution engine tuning
    #[serde(default)]
    pub engine: EngineAppConfig,

    /// Routing providers in preference order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderAppConfig>,

    /// Hubs merged into the built-in catalog
    #[serde(default)]
    pub hubs: Vec<HubAppConfig>,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_providers() -> Vec<ProviderAppConfig> {
    vec![ProviderAppConfig::public_hafas()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: None,
            engine: EngineAppConfig::default(),
            providers: default_providers(),
            hubs: Vec::new(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `rendezvous.toml` (if present) and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file (required) and environment
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let builder = config::Config::builder()
            .add_source(file)
            // e.g. RENDEZVOUS_DATABASE__PATH=/var/lib/rendezvous.db
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Active environment (defaults to development)
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment.unwrap_or_default()
    }

    /// Providers that take part in resolutions, in preference order
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderAppConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Validate the whole configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        self.engine.to_settings().map_err(|e| e.to_string())?;
        self.database.validate()?;

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.id.as_str()) {
                return Err(format!("duplicate provider id '{}'", provider.id));
            }
            if provider.enabled {
                provider.validate()?;
            }
        }

        for hub in &self.hubs {
            hub.to_hub()?;
        }

        Ok(())
    }
}
