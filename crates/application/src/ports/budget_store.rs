//! Budget state persistence port

use async_trait::async_trait;
use domain::{BudgetState, ProviderId};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for persisting per-provider budget state across restarts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BudgetStorePort: Send + Sync {
    /// Load the stored state of a provider
    async fn load(&self, provider_id: &ProviderId) -> Result<Option<BudgetState>, ApplicationError>;

    /// Insert or replace the state of a provider
    async fn save(&self, state: &BudgetState) -> Result<(), ApplicationError>;

    /// All stored states, ordered by provider id
    async fn list(&self) -> Result<Vec<BudgetState>, ApplicationError>;
}
