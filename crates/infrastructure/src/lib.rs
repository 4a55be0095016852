//! Infrastructure layer - Adapters for external systems
//!
//! Implements ports defined in the application layer: SQLite persistence of
//! provider budgets and routing adapters over the HTTP provider clients.
//! Also owns configuration loading, logging setup and service wiring.

pub mod adapters;
pub mod bootstrap;
pub mod config;
pub mod persistence;
pub mod telemetry;

pub use adapters::{PROVIDER_REQUESTS_METRIC, RoutingAdapter, client_for};
pub use bootstrap::{
    BootstrapError, build_hub_registry, build_ledger, build_service, build_service_with_store,
    open_budget_store,
};
pub use config::{
    AppConfig, DatabaseConfig, EngineAppConfig, Environment, HubAppConfig, LoggingConfig,
    ProviderAppConfig, ProviderKind,
};
pub use persistence::{ConnectionPool, SqliteBudgetStore, create_pool};
pub use telemetry::{TelemetryError, init_logging};
