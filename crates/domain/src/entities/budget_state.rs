//! Persisted per-provider usage for one billing period

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{BillingPeriod, ProviderId};

/// Usage a provider has accrued in the current billing period
///
/// Caps and free-tier thresholds live in the ledger's quota configuration;
/// this entity only carries the counters that survive restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetState {
    /// Provider this usage belongs to
    pub provider_id: ProviderId,
    /// Month the counters apply to
    pub period: BillingPeriod,
    /// Requests dispatched this period
    pub consumed_requests: u64,
    /// Currency spent this period (free-tier quotas only)
    pub spend: f64,
    /// Day the counters were last zeroed
    pub last_reset_date: NaiveDate,
}

impl BudgetState {
    /// Fresh, zeroed state for the period containing `now`
    #[must_use]
    pub fn new(provider_id: ProviderId, now: DateTime<Utc>) -> Self {
        Self {
            provider_id,
            period: BillingPeriod::containing(now),
            consumed_requests: 0,
            spend: 0.0,
            last_reset_date: now.date_naive(),
        }
    }

    /// Whether `now` falls into a different month than the stored period
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.period != BillingPeriod::containing(now)
    }

    /// Zero the counters and move to the period containing `now`
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.period = BillingPeriod::containing(now);
        self.consumed_requests = 0;
        self.spend = 0.0;
        self.last_reset_date = now.date_naive();
    }

    /// Add dispatched requests and their cost
    pub fn add_usage(&mut self, requests: u64, cost: f64) {
        self.consumed_requests = self.consumed_requests.saturating_add(requests);
        if cost.is_finite() && cost > 0.0 {
            self.spend += cost;
        }
    }
}
