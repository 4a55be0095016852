//! Budget ledger
//!
//! Tracks how much of each provider's monthly quota has been used, decides
//! whether a provider may be used for a given trip length, and persists the
//! counters through a [`BudgetStorePort`] so they survive restarts.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::{BillingPeriod, BudgetState, ProviderId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{BudgetStorePort, ProviderError};

/// Usage percentages at which a warning is logged when crossed
pub const USAGE_WARNING_THRESHOLDS: [f64; 2] = [80.0, 90.0];

/// Minimum trip length for provider use between 50% and 80% usage
pub const RESTRICTED_MIN_DISTANCE_METERS: f64 = 2000.0;

/// Minimum trip length for provider use between 80% and 95% usage
pub const SCARCE_MIN_DISTANCE_METERS: f64 = 5000.0;

/// Tolerance for floating point spend comparisons
const SPEND_EPSILON: f64 = 1e-9;

/// Shape of a provider's monthly allowance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderQuota {
    /// Fixed number of requests per month
    RequestCount {
        /// Requests allowed per month
        monthly_cap: u64,
    },
    /// Free up to a request count, then billed per request against a spend cap
    FreeTier {
        /// Requests per month that cost nothing
        free_requests: u64,
        /// Price of each request beyond the free tier
        cost_per_request: f64,
        /// Maximum monthly spend in currency units
        monthly_cap: f64,
    },
}

impl Default for ProviderQuota {
    fn default() -> Self {
        Self::RequestCount {
            monthly_cap: 10_000,
        }
    }
}

impl ProviderQuota {
    /// Validate the quota values
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::RequestCount { .. } => Ok(()),
            Self::FreeTier {
                cost_per_request,
                monthly_cap,
                ..
            } => {
                if !cost_per_request.is_finite() || cost_per_request < 0.0 {
                    return Err(format!("cost_per_request must be >= 0, got {cost_per_request}"));
                }
                if !monthly_cap.is_finite() || monthly_cap < 0.0 {
                    return Err(format!("monthly_cap must be >= 0, got {monthly_cap}"));
                }
                Ok(())
            },
        }
    }

    /// Spend accrued by the first `consumed` requests of a period
    #[allow(clippy::cast_precision_loss)]
    pub fn spend_for(&self, consumed: u64) -> f64 {
        match *self {
            Self::RequestCount { .. } => 0.0,
            Self::FreeTier {
                free_requests,
                cost_per_request,
                ..
            } => consumed.saturating_sub(free_requests) as f64 * cost_per_request,
        }
    }

    /// Share of the allowance used, in percent
    ///
    /// Free-tier quotas measure spend against the spend cap, so requests
    /// inside the free tier do not count.
    #[allow(clippy::cast_precision_loss)]
    pub fn usage_percent(&self, state: &BudgetState) -> f64 {
        match *self {
            Self::RequestCount { monthly_cap } => {
                if monthly_cap == 0 {
                    100.0
                } else {
                    state.consumed_requests as f64 / monthly_cap as f64 * 100.0
                }
            },
            Self::FreeTier {
                free_requests,
                monthly_cap,
                ..
            } => {
                if monthly_cap > 0.0 {
                    state.spend / monthly_cap * 100.0
                } else if state.consumed_requests < free_requests {
                    0.0
                } else {
                    100.0
                }
            },
        }
    }

    /// Whether `requests` more requests fit in the allowance
    ///
    /// Always false once the allowance is exhausted, even for zero requests.
    pub fn can_consume(&self, state: &BudgetState, requests: u64) -> bool {
        let requests = requests.max(1);
        match *self {
            Self::RequestCount { monthly_cap } => state
                .consumed_requests
                .checked_add(requests)
                .is_some_and(|total| total <= monthly_cap),
            Self::FreeTier { monthly_cap, .. } => {
                let Some(total) = state.consumed_requests.checked_add(requests) else {
                    return false;
                };
                let extra = self.spend_for(total) - self.spend_for(state.consumed_requests);
                state.spend + extra <= monthly_cap + SPEND_EPSILON
            },
        }
    }
}

/// Provider-use policy derived from the usage percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePolicy {
    /// Below 50%: always allow
    Open,
    /// 50% up to 80%: only trips longer than 2 km
    Restricted,
    /// 80% up to 95%: only trips longer than 5 km
    Scarce,
    /// 95% and above: keep the rest in reserve
    Reserved,
}

impl UsagePolicy {
    /// Policy tier for a usage percentage (non-finite values are treated as exhausted)
    pub fn for_usage(percent: f64) -> Self {
        if !percent.is_finite() || percent >= 95.0 {
            Self::Reserved
        } else if percent >= 80.0 {
            Self::Scarce
        } else if percent >= 50.0 {
            Self::Restricted
        } else {
            Self::Open
        }
    }

    /// Whether a trip of `distance_m` between the parties may use the provider
    pub fn allows(self, distance_m: f64) -> bool {
        match self {
            Self::Open => true,
            Self::Restricted => distance_m > RESTRICTED_MIN_DISTANCE_METERS,
            Self::Scarce => distance_m > SCARCE_MIN_DISTANCE_METERS,
            Self::Reserved => false,
        }
    }

    /// Short label for display
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Restricted => "restricted",
            Self::Scarce => "scarce",
            Self::Reserved => "reserved",
        }
    }
}

impl fmt::Display for UsagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one provider's budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub provider_id: ProviderId,
    pub period: BillingPeriod,
    pub consumed_requests: u64,
    pub spend: f64,
    pub usage_percent: f64,
    pub policy: UsagePolicy,
    pub quota: ProviderQuota,
}

struct ProviderBudget {
    quota: ProviderQuota,
    state: Mutex<BudgetState>,
    /// Held from a mutation until its snapshot is saved, so saves land in
    /// the order the counters changed
    writes: AsyncMutex<()>,
}

impl ProviderBudget {
    fn new(quota: ProviderQuota, state: BudgetState) -> Self {
        Self {
            quota,
            state: Mutex::new(state),
            writes: AsyncMutex::new(()),
        }
    }
}

impl ProviderBudget {
    fn status(&self) -> BudgetStatus {
        let state = self.state.lock();
        let usage_percent = self.quota.usage_percent(&state);
        BudgetStatus {
            provider_id: state.provider_id.clone(),
            period: state.period,
            consumed_requests: state.consumed_requests,
            spend: state.spend,
            usage_percent,
            policy: UsagePolicy::for_usage(usage_percent),
            quota: self.quota,
        }
    }
}

/// Per-provider monthly usage bookkeeping
///
/// Each provider's counters sit behind their own lock, so charges to
/// different providers never contend. The counter lock is never held across
/// an await; a separate per-provider write guard orders persistence.
pub struct BudgetLedger {
    providers: HashMap<ProviderId, ProviderBudget>,
    store: Option<Arc<dyn BudgetStorePort>>,
}

impl fmt::Debug for BudgetLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetLedger")
            .field("providers", &self.providers.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl BudgetLedger {
    /// Ledger without persistence, starting from zero usage
    pub fn in_memory(quotas: impl IntoIterator<Item = (ProviderId, ProviderQuota)>) -> Self {
        let now = Utc::now();
        let providers = quotas
            .into_iter()
            .map(|(id, quota)| {
                let state = BudgetState::new(id.clone(), now);
                (id, ProviderBudget::new(quota, state))
            })
            .collect();
        Self {
            providers,
            store: None,
        }
    }

    /// Ledger backed by a store, restoring previously persisted usage
    ///
    /// Restored states from an earlier month are reset immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state cannot be loaded.
    pub async fn with_store(
        quotas: impl IntoIterator<Item = (ProviderId, ProviderQuota)>,
        store: Arc<dyn BudgetStorePort>,
    ) -> Result<Self, ApplicationError> {
        let now = Utc::now();
        let mut providers = HashMap::new();
        for (id, quota) in quotas {
            let state = match store.load(&id).await? {
                Some(state) => {
                    debug!(provider = %id, consumed = state.consumed_requests, "Restored budget state");
                    state
                },
                None => BudgetState::new(id.clone(), now),
            };
            providers.insert(id, ProviderBudget::new(quota, state));
        }

        let ledger = Self {
            providers,
            store: Some(store),
        };
        ledger.reset_if_new_month_at(now).await;
        Ok(ledger)
    }

    /// Whether the provider has a registered quota
    pub fn contains(&self, provider_id: &ProviderId) -> bool {
        self.providers.contains_key(provider_id)
    }

    /// Current usage of a provider in percent
    pub fn usage_percent(&self, provider_id: &ProviderId) -> Option<f64> {
        self.providers
            .get(provider_id)
            .map(|b| b.quota.usage_percent(&b.state.lock()))
    }

    /// Current policy tier of a provider
    pub fn policy(&self, provider_id: &ProviderId) -> Option<UsagePolicy> {
        self.usage_percent(provider_id).map(UsagePolicy::for_usage)
    }

    /// Whether the usage policy lets a trip of `distance_m` use this provider
    ///
    /// Unregistered providers are never allowed.
    pub fn policy_allows(&self, provider_id: &ProviderId, distance_m: f64) -> bool {
        self.policy(provider_id)
            .is_some_and(|policy| policy.allows(distance_m))
    }

    /// Whether `requests` more requests fit in the provider's allowance
    pub fn can_consume(&self, provider_id: &ProviderId, requests: u64) -> bool {
        self.providers
            .get(provider_id)
            .is_some_and(|b| b.quota.can_consume(&b.state.lock(), requests))
    }

    /// Charge `requests` if they fit in the allowance
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::BudgetExceeded` if the provider is unknown or
    /// the charge would exceed its allowance. Nothing is recorded then.
    #[instrument(skip(self, provider_id), fields(provider = %provider_id))]
    pub async fn try_consume(
        &self,
        provider_id: &ProviderId,
        requests: u64,
    ) -> Result<(), ProviderError> {
        let Some(budget) = self.providers.get(provider_id) else {
            return Err(ProviderError::BudgetExceeded);
        };

        let _write = budget.writes.lock().await;
        let (snapshot, before, after) = {
            let mut state = budget.state.lock();
            if !budget.quota.can_consume(&state, requests) {
                debug!("Budget exhausted");
                return Err(ProviderError::BudgetExceeded);
            }
            apply_usage(&budget.quota, &mut state, requests)
        };

        warn_on_thresholds(provider_id, before, after);
        self.persist_lenient(&snapshot).await;
        Ok(())
    }

    /// Charge `requests` unconditionally
    #[instrument(skip(self, provider_id), fields(provider = %provider_id))]
    pub async fn record(&self, provider_id: &ProviderId, requests: u64) {
        let Some(budget) = self.providers.get(provider_id) else {
            debug!("Ignoring usage for unregistered provider");
            return;
        };

        let _write = budget.writes.lock().await;
        let (snapshot, before, after) = {
            let mut state = budget.state.lock();
            apply_usage(&budget.quota, &mut state, requests)
        };

        warn_on_thresholds(provider_id, before, after);
        self.persist_lenient(&snapshot).await;
    }

    /// Zero the counters of every provider whose period is not the current month
    ///
    /// Returns the providers that were reset.
    pub async fn reset_if_new_month(&self) -> Vec<ProviderId> {
        self.reset_if_new_month_at(Utc::now()).await
    }

    /// [`Self::reset_if_new_month`] against an explicit clock reading
    pub async fn reset_if_new_month_at(&self, now: DateTime<Utc>) -> Vec<ProviderId> {
        let mut reset = Vec::new();
        for (id, budget) in &self.providers {
            let _write = budget.writes.lock().await;
            let snapshot = {
                let mut state = budget.state.lock();
                if !state.is_stale(now) {
                    continue;
                }
                let old_period = state.period;
                state.reset(now);
                info!(provider = %id, from = %old_period, to = %state.period, "Budget period rolled over");
                state.clone()
            };
            self.persist_lenient(&snapshot).await;
            reset.push(id.clone());
        }
        reset.sort();
        reset
    }

    /// Snapshot of every provider, ordered by provider id
    pub fn status(&self) -> Vec<BudgetStatus> {
        let mut all: Vec<BudgetStatus> = self.providers.values().map(ProviderBudget::status).collect();
        all.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
        all
    }

    /// Snapshot of a single provider
    pub fn status_of(&self, provider_id: &ProviderId) -> Option<BudgetStatus> {
        self.providers.get(provider_id).map(ProviderBudget::status)
    }

    /// Overwrite the consumed request count (spend is recomputed from the quota)
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unknown or the state cannot be saved.
    pub async fn set_consumed(
        &self,
        provider_id: &ProviderId,
        consumed_requests: u64,
    ) -> Result<BudgetStatus, ApplicationError> {
        let budget = self.budget(provider_id)?;
        let _write = budget.writes.lock().await;
        let snapshot = {
            let mut state = budget.state.lock();
            state.consumed_requests = consumed_requests;
            state.spend = budget.quota.spend_for(consumed_requests);
            state.clone()
        };
        self.persist_strict(&snapshot).await?;
        Ok(budget.status())
    }

    /// Zero a provider's counters for the current month
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unknown or the state cannot be saved.
    pub async fn reset(&self, provider_id: &ProviderId) -> Result<BudgetStatus, ApplicationError> {
        let budget = self.budget(provider_id)?;
        let _write = budget.writes.lock().await;
        let snapshot = {
            let mut state = budget.state.lock();
            state.reset(Utc::now());
            state.clone()
        };
        self.persist_strict(&snapshot).await?;
        info!(provider = %provider_id, "Budget reset");
        Ok(budget.status())
    }

    fn budget(&self, provider_id: &ProviderId) -> Result<&ProviderBudget, ApplicationError> {
        self.providers.get(provider_id).ok_or_else(|| {
            ApplicationError::Configuration(format!("No budget configured for provider '{provider_id}'"))
        })
    }

    async fn persist_lenient(&self, state: &BudgetState) {
        if let Err(e) = self.persist_strict(state).await {
            warn!(provider = %state.provider_id, error = %e, "Failed to persist budget state");
        }
    }

    async fn persist_strict(&self, state: &BudgetState) -> Result<(), ApplicationError> {
        match &self.store {
            Some(store) => store.save(state).await,
            None => Ok(()),
        }
    }
}

/// Record usage and return (snapshot, usage before, usage after)
fn apply_usage(
    quota: &ProviderQuota,
    state: &mut BudgetState,
    requests: u64,
) -> (BudgetState, f64, f64) {
    let before = quota.usage_percent(state);
    let total = state.consumed_requests.saturating_add(requests);
    let cost = quota.spend_for(total) - quota.spend_for(state.consumed_requests);
    state.add_usage(requests, cost);
    let after = quota.usage_percent(state);
    (state.clone(), before, after)
}

fn warn_on_thresholds(provider_id: &ProviderId, before: f64, after: f64) {
    for threshold in USAGE_WARNING_THRESHOLDS {
        if before < threshold && after >= threshold {
            warn!(
                provider = %provider_id,
                usage_percent = after,
                threshold,
                "Provider budget usage crossed threshold"
            );
        }
    }
}
