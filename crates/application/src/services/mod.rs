//! Application services - Use case implementations

mod budget_ledger;
mod hub_registry;
mod meeting_point_service;
mod rate_limiter;
mod scorer;

pub use budget_ledger::{
    BudgetLedger, BudgetStatus, ProviderQuota, RESTRICTED_MIN_DISTANCE_METERS,
    SCARCE_MIN_DISTANCE_METERS, USAGE_WARNING_THRESHOLDS, UsagePolicy,
};
pub use hub_registry::{DEFAULT_MAX_HUB_CANDIDATES, HubRegistry, RELEVANCE_FACTOR, filter_relevant};
pub use meeting_point_service::{
    DEFAULT_DEPARTURE_OFFSET_MINUTES, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RING_CANDIDATE_COUNT,
    DEFAULT_RING_RADIUS_FRACTION, EngineSettings, MAX_RING_RADIUS_METERS, MIN_RING_RADIUS_METERS,
    MeetingPointService, ProviderSlot, ResolutionRequest, ResolutionState,
};
pub use rate_limiter::{
    DEFAULT_MIN_INTERVAL, DEFAULT_THROTTLE_BACKOFF, RateLimiter, ThrottleRetryPolicy,
};
pub use scorer::{
    CandidateSelector, DEFAULT_FAIRNESS_WEIGHT, DEFAULT_MAJOR_HUB_BONUS_SECS,
    DEFAULT_TRANSFER_PENALTY_SECS, FAIRNESS_WEIGHT_MAX, FAIRNESS_WEIGHT_MIN, Scorer,
    ScoringWeights,
};
