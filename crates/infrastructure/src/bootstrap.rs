//! Wiring of configuration into a ready-to-use resolution service

use std::sync::Arc;

use application::{
    ApplicationError, BudgetLedger, BudgetStorePort, HubRegistry, MeetingPointService,
    ProviderSlot,
};
use integration_routing::RoutingError;
use thiserror::Error;
use tracing::{info, instrument};

use crate::adapters::RoutingAdapter;
use crate::config::{AppConfig, HubAppConfig};
use crate::persistence::{DatabaseError, SqliteBudgetStore, create_pool};

/// Errors raised while assembling the engine
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Budget database could not be opened
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A provider client could not be created
    #[error("Provider setup failed: {0}")]
    Routing(#[from] RoutingError),

    /// Application-level failure (e.g. loading budget state)
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// Open the configured budget database
pub fn open_budget_store(config: &AppConfig) -> Result<Arc<SqliteBudgetStore>, BootstrapError> {
    let pool = create_pool(&config.database)?;
    Ok(Arc::new(SqliteBudgetStore::new(Arc::new(pool))))
}

/// Ledger for every enabled provider, restored from `store`
pub async fn build_ledger(
    config: &AppConfig,
    store: Arc<dyn BudgetStorePort>,
) -> Result<BudgetLedger, BootstrapError> {
    let quotas = config
        .enabled_providers()
        .map(|p| p.provider_id().map(|id| (id, p.quota)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(BootstrapError::Config)?;

    Ok(BudgetLedger::with_store(quotas, store).await?)
}

/// Built-in catalog plus configured hubs
pub fn build_hub_registry(config: &AppConfig) -> Result<HubRegistry, BootstrapError> {
    let extra = config
        .hubs
        .iter()
        .map(HubAppConfig::to_hub)
        .collect::<Result<Vec<_>, _>>()
        .map_err(BootstrapError::Config)?;
    Ok(HubRegistry::builtin().with_hubs(extra))
}

/// Provider slots in configuration order
pub fn build_providers(config: &AppConfig) -> Result<Vec<ProviderSlot>, BootstrapError> {
    config
        .enabled_providers()
        .map(|provider| {
            let adapter = RoutingAdapter::from_config(provider)?;
            Ok(ProviderSlot::new(
                adapter.provider_id().clone(),
                Arc::new(adapter),
                provider.rate_limiter(),
            )
            .with_concurrent_requests(provider.concurrent_requests))
        })
        .collect()
}

/// Assemble the resolution service with an explicit budget store
pub async fn build_service_with_store(
    config: &AppConfig,
    store: Arc<dyn BudgetStorePort>,
) -> Result<MeetingPointService, BootstrapError> {
    config.validate().map_err(BootstrapError::Config)?;

    let settings = config.engine.to_settings()?;
    let ledger = Arc::new(build_ledger(config, store).await?);
    let hubs = build_hub_registry(config)?;
    let providers = build_providers(config)?;

    info!(
        providers = providers.len(),
        hubs = hubs.len(),
        "Meeting point service ready"
    );
    Ok(MeetingPointService::new(providers, ledger, hubs, settings))
}

/// Assemble the resolution service backed by the configured database
#[instrument(skip(config))]
pub async fn build_service(config: &AppConfig) -> Result<MeetingPointService, BootstrapError> {
    config.validate().map_err(BootstrapError::Config)?;
    let store = open_budget_store(config)?;
    build_service_with_store(config, store).await
}
