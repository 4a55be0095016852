//! Domain entities

mod budget_state;
mod candidate;
mod hub;
mod resolution;
mod route_metrics;

pub use budget_state::BudgetState;
pub use candidate::Candidate;
pub use hub::Hub;
pub use resolution::{
    FallbackReason, ResolutionResult, ScoreBreakdown, ScoreResult, SkippedCandidate,
};
pub use route_metrics::{DEFAULT_DISTANCE_METERS, DEFAULT_DURATION_SECONDS, RouteMetrics};
