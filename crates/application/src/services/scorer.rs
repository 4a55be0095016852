//! Candidate scoring and selection
//!
//! A score is a duration in seconds: both parties' travel times plus
//! penalties for imbalance and transfers, minus a bonus for major hubs.
//! Lower is better.

use domain::{Candidate, ImportanceTier, RouteMetrics, ScoreBreakdown, ScoreResult};
use tracing::debug;

use crate::error::ApplicationError;

/// Default multiplier on the travel time difference between the parties
pub const DEFAULT_FAIRNESS_WEIGHT: f64 = 2.5;

/// Accepted range for the fairness weight
pub const FAIRNESS_WEIGHT_MIN: f64 = 2.0;
/// Accepted range for the fairness weight
pub const FAIRNESS_WEIGHT_MAX: f64 = 3.0;

/// Default penalty per transfer in seconds
pub const DEFAULT_TRANSFER_PENALTY_SECS: f64 = 300.0;

/// Default score reduction for major hubs in seconds
pub const DEFAULT_MAJOR_HUB_BONUS_SECS: f64 = 300.0;

/// Tunable weights of the scoring function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    fairness_weight: f64,
    transfer_penalty_secs: f64,
    major_hub_bonus_secs: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            fairness_weight: DEFAULT_FAIRNESS_WEIGHT,
            transfer_penalty_secs: DEFAULT_TRANSFER_PENALTY_SECS,
            major_hub_bonus_secs: DEFAULT_MAJOR_HUB_BONUS_SECS,
        }
    }
}

impl ScoringWeights {
    /// Create validated weights
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Configuration` if the fairness weight is
    /// outside [2, 3] or a penalty is negative or not finite.
    pub fn new(
        fairness_weight: f64,
        transfer_penalty_secs: f64,
        major_hub_bonus_secs: f64,
    ) -> Result<Self, ApplicationError> {
        if !(FAIRNESS_WEIGHT_MIN..=FAIRNESS_WEIGHT_MAX).contains(&fairness_weight) {
            return Err(ApplicationError::Configuration(format!(
                "fairness_weight must be within [{FAIRNESS_WEIGHT_MIN}, {FAIRNESS_WEIGHT_MAX}], got {fairness_weight}"
            )));
        }
        for (name, value) in [
            ("transfer_penalty_secs", transfer_penalty_secs),
            ("major_hub_bonus_secs", major_hub_bonus_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ApplicationError::Configuration(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(Self {
            fairness_weight,
            transfer_penalty_secs,
            major_hub_bonus_secs,
        })
    }

    #[must_use]
    pub const fn fairness_weight(&self) -> f64 {
        self.fairness_weight
    }

    #[must_use]
    pub const fn transfer_penalty_secs(&self) -> f64 {
        self.transfer_penalty_secs
    }

    #[must_use]
    pub const fn major_hub_bonus_secs(&self) -> f64 {
        self.major_hub_bonus_secs
    }
}

/// Combines two parties' route metrics into a comparable score
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    #[must_use]
    pub const fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    #[must_use]
    pub const fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Score a meeting point reached with the given routes
    #[must_use]
    pub fn score(
        &self,
        user: &RouteMetrics,
        friend: &RouteMetrics,
        tier: ImportanceTier,
    ) -> ScoreBreakdown {
        let travel_time_secs = user.duration_seconds() + friend.duration_seconds();
        let fairness_penalty =
            self.weights.fairness_weight * (user.duration_seconds() - friend.duration_seconds()).abs();
        let transfers = u64::from(user.transfer_count()) + u64::from(friend.transfer_count());
        #[allow(clippy::cast_precision_loss)]
        let transfer_penalty = self.weights.transfer_penalty_secs * transfers as f64;
        let importance_bonus = if tier == ImportanceTier::Major {
            -self.weights.major_hub_bonus_secs
        } else {
            0.0
        };

        ScoreBreakdown {
            total: travel_time_secs + fairness_penalty + transfer_penalty + importance_bonus,
            travel_time_secs,
            fairness_penalty,
            transfer_penalty,
            importance_bonus,
        }
    }

    /// Score a candidate and bundle it with its routes
    #[must_use]
    pub fn evaluate(
        &self,
        candidate: Candidate,
        user: RouteMetrics,
        friend: RouteMetrics,
    ) -> ScoreResult {
        let score = self.score(&user, &friend, candidate.tier);
        ScoreResult {
            candidate,
            score,
            user_metrics: user,
            friend_metrics: friend,
        }
    }
}

/// Keeps the best scored candidate seen so far
///
/// Only a strictly lower score replaces the current best, so among equal
/// scores the first one offered wins.
#[derive(Debug, Default)]
pub struct CandidateSelector {
    best: Option<ScoreResult>,
    offered: usize,
}

impl CandidateSelector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            best: None,
            offered: 0,
        }
    }

    /// Offer a scored candidate; returns true if it became the new best
    pub fn offer(&mut self, result: ScoreResult) -> bool {
        self.offered += 1;
        let improves = self
            .best
            .as_ref()
            .is_none_or(|best| result.total() < best.total());
        if improves {
            debug!(
                candidate = %result.candidate.label,
                score = result.total(),
                "New best candidate"
            );
            self.best = Some(result);
        }
        improves
    }

    /// Number of candidates offered
    #[must_use]
    pub const fn offered(&self) -> usize {
        self.offered
    }

    #[must_use]
    pub const fn best(&self) -> Option<&ScoreResult> {
        self.best.as_ref()
    }

    #[must_use]
    pub fn into_best(self) -> Option<ScoreResult> {
        self.best
    }
}
