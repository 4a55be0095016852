//! SQLite budget store implementation
//!
//! Implements the `BudgetStorePort` port using SQLite.

use std::sync::Arc;

use application::{ApplicationError, BudgetStorePort};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use domain::{BillingPeriod, BudgetState, ProviderId};
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;

/// SQLite-based budget store
#[derive(Debug, Clone)]
pub struct SqliteBudgetStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteBudgetStore {
    /// Create a new SQLite budget store
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

fn conversion_error(column: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

/// Convert a database row to a `BudgetState`
fn row_to_state(row: &Row<'_>) -> Result<BudgetState, rusqlite::Error> {
    let provider_id: String = row.get(0)?;
    let period: String = row.get(1)?;
    let consumed: i64 = row.get(2)?;
    let spend: f64 = row.get(3)?;
    let last_reset: String = row.get(4)?;

    Ok(BudgetState {
        provider_id: ProviderId::new(provider_id).map_err(|e| conversion_error(0, e))?,
        period: period
            .parse::<BillingPeriod>()
            .map_err(|e| conversion_error(1, e))?,
        consumed_requests: u64::try_from(consumed).unwrap_or(0),
        spend: if spend.is_finite() && spend > 0.0 { spend } else { 0.0 },
        last_reset_date: NaiveDate::parse_from_str(&last_reset, "%Y-%m-%d")
            .map_err(|e| conversion_error(4, e))?,
    })
}

fn persistence_error(e: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::Persistence(e.to_string())
}

#[async_trait]
impl BudgetStorePort for SqliteBudgetStore {
    #[instrument(skip(self))]
    async fn load(&self, provider_id: &ProviderId) -> Result<Option<BudgetState>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let id = provider_id.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(persistence_error)?;

            let state = conn
                .query_row(
                    "SELECT provider_id, period, consumed_requests, spend, last_reset_date
                     FROM budget_states WHERE provider_id = ?1",
                    [&id],
                    row_to_state,
                )
                .optional()
                .map_err(persistence_error)?;

            debug!(found = state.is_some(), "Loaded budget state");
            Ok(state)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self, state), fields(provider = %state.provider_id, consumed = state.consumed_requests))]
    async fn save(&self, state: &BudgetState) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let state = state.clone();
        let now = Utc::now().to_rfc3339();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(persistence_error)?;
            let consumed = i64::try_from(state.consumed_requests).unwrap_or(i64::MAX);

            conn.execute(
                "INSERT INTO budget_states (provider_id, period, consumed_requests, spend, last_reset_date, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(provider_id) DO UPDATE SET
                     period = excluded.period,
                     consumed_requests = excluded.consumed_requests,
                     spend = excluded.spend,
                     last_reset_date = excluded.last_reset_date,
                     updated_at = excluded.updated_at",
                params![
                    state.provider_id.as_str(),
                    state.period.to_string(),
                    consumed,
                    state.spend,
                    state.last_reset_date.format("%Y-%m-%d").to_string(),
                    now,
                ],
            )
            .map_err(persistence_error)?;

            debug!("Saved budget state");
            Ok(())
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<BudgetState>, ApplicationError> {
        let pool = Arc::clone(&self.pool);

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(persistence_error)?;

            let mut stmt = conn
                .prepare(
                    "SELECT provider_id, period, consumed_requests, spend, last_reset_date
                     FROM budget_states ORDER BY provider_id",
                )
                .map_err(persistence_error)?;

            let states = stmt
                .query_map([], row_to_state)
                .map_err(persistence_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(persistence_error)?;

            debug!(count = states.len(), "Listed budget states");
            Ok(states)
        })
        .await
        .map_err(|e| ApplicationError::Internal(e.to_string()))?
    }
}
