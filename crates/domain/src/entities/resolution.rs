//! Scoring and resolution outcome entities

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Candidate, RouteMetrics};
use crate::value_objects::{Coordinate, ProviderId};

/// The individual terms that add up to a candidate score (all in seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Sum of all terms; lower is better
    pub total: f64,
    /// Combined travel time of both parties
    pub travel_time_secs: f64,
    /// Weighted absolute difference of the two travel times
    pub fairness_penalty: f64,
    /// Weighted combined transfer count
    pub transfer_penalty: f64,
    /// Negative for major hubs, zero otherwise
    pub importance_bonus: f64,
}

/// A candidate together with the routes both parties would take
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub candidate: Candidate,
    pub score: ScoreBreakdown,
    pub user_metrics: RouteMetrics,
    pub friend_metrics: RouteMetrics,
}

impl ScoreResult {
    /// Total score, lower is better
    #[must_use]
    pub const fn total(&self) -> f64 {
        self.score.total
    }
}

/// A candidate that was dropped during evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub label: String,
    pub reason: String,
}

/// Why a resolution ended in the geometric midpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Usage policy denied every provider before any request was made
    BudgetPolicy,
    /// No provider is configured or every provider is marked dead
    NoProviders,
    /// Every candidate was skipped
    AllCandidatesFailed,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BudgetPolicy => "budget_policy",
            Self::NoProviders => "no_providers",
            Self::AllCandidatesFailed => "all_candidates_failed",
        };
        f.write_str(s)
    }
}

/// Final answer of a meeting-point resolution
///
/// A resolution always yields a coordinate. `used_provider == false` means the
/// coordinate is the plain spherical midpoint of the two inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub coordinate: Coordinate,
    pub used_provider: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_breakdown: Option<ScoreBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    pub candidates_evaluated: usize,
    pub skipped: Vec<SkippedCandidate>,
}

impl ResolutionResult {
    /// Result for a winning candidate
    #[must_use]
    pub fn selected(
        winner: &ScoreResult,
        provider: ProviderId,
        candidates_evaluated: usize,
        skipped: Vec<SkippedCandidate>,
    ) -> Self {
        Self {
            coordinate: winner.candidate.coordinate,
            used_provider: true,
            candidate_label: Some(winner.candidate.label.clone()),
            score_breakdown: Some(winner.score),
            provider: Some(provider),
            fallback_reason: None,
            candidates_evaluated,
            skipped,
        }
    }

    /// Result for the geometric fallback
    #[must_use]
    pub fn geometric(
        midpoint: Coordinate,
        reason: FallbackReason,
        candidates_evaluated: usize,
        skipped: Vec<SkippedCandidate>,
    ) -> Self {
        Self {
            coordinate: midpoint,
            used_provider: false,
            candidate_label: None,
            score_breakdown: None,
            provider: None,
            fallback_reason: Some(reason),
            candidates_evaluated,
            skipped,
        }
    }
}
