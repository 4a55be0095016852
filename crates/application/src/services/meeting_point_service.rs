//! Meeting-point resolution
//!
//! [`MeetingPointService`] is the fallback controller of the engine. Each
//! resolution moves through
//! `Init -> BudgetCheck -> CandidateEvaluation -> Scoring -> Selected`,
//! and may drop to `GeographicFallback` from any state. The only error a
//! caller ever sees is [`ApplicationError::InvalidInput`]; every provider
//! problem degrades the answer instead, down to the plain spherical midpoint.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::geometry::{generate_ring_candidates, spherical_midpoint};
use domain::{
    Candidate, Coordinate, FallbackReason, ProviderId, ResolutionResult, RouteMetrics,
    SkippedCandidate, TravelMode,
};
use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use super::budget_ledger::BudgetLedger;
use super::hub_registry::{DEFAULT_MAX_HUB_CANDIDATES, HubRegistry};
use super::rate_limiter::RateLimiter;
use super::scorer::{CandidateSelector, Scorer, ScoringWeights};
use crate::error::ApplicationError;
use crate::ports::{ProviderError, RouteRequest, RoutingPort};

/// Default number of generated candidates when no hub is relevant
pub const DEFAULT_RING_CANDIDATE_COUNT: usize = 6;

/// Default ring radius as a fraction of the distance between the parties
pub const DEFAULT_RING_RADIUS_FRACTION: f64 = 0.25;

/// Lower bound of the ring radius
pub const MIN_RING_RADIUS_METERS: f64 = 250.0;

/// Upper bound of the ring radius
pub const MAX_RING_RADIUS_METERS: f64 = 2000.0;

/// Default timeout of a single provider request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default departure time offset from now, so providers never see a past departure
pub const DEFAULT_DEPARTURE_OFFSET_MINUTES: i64 = 5;

/// Requests needed to evaluate one candidate (one per party)
const REQUESTS_PER_CANDIDATE: u64 = 2;

/// States of a single resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Init,
    BudgetCheck,
    CandidateEvaluation,
    Scoring,
    Selected,
    GeographicFallback,
}

impl ResolutionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::BudgetCheck => "budget_check",
            Self::CandidateEvaluation => "candidate_evaluation",
            Self::Scoring => "scoring",
            Self::Selected => "selected",
            Self::GeographicFallback => "geographic_fallback",
        }
    }

    /// Whether no further transition is possible
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Selected | Self::GeographicFallback)
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn advance(state: &mut ResolutionState, next: ResolutionState) {
    if *state != next {
        debug!(from = %state, to = %next, "Resolution state transition");
        *state = next;
    }
}

/// Tunables of the resolution engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Hub candidates evaluated per resolution
    pub max_hub_candidates: usize,
    /// Generated candidates used when no hub is relevant
    pub ring_candidate_count: usize,
    /// Ring radius as a fraction of the party distance
    pub ring_radius_fraction: f64,
    /// Timeout of each provider request
    pub request_timeout: Duration,
    /// Default departure offset from now
    pub departure_offset_minutes: i64,
    /// Scoring weights
    pub weights: ScoringWeights,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_hub_candidates: DEFAULT_MAX_HUB_CANDIDATES,
            ring_candidate_count: DEFAULT_RING_CANDIDATE_COUNT,
            ring_radius_fraction: DEFAULT_RING_RADIUS_FRACTION,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            departure_offset_minutes: DEFAULT_DEPARTURE_OFFSET_MINUTES,
            weights: ScoringWeights::default(),
        }
    }
}

impl EngineSettings {
    /// Ring radius for parties `distance_m` apart
    #[must_use]
    pub fn ring_radius_meters(&self, distance_m: f64) -> f64 {
        (distance_m * self.ring_radius_fraction).clamp(MIN_RING_RADIUS_METERS, MAX_RING_RADIUS_METERS)
    }
}

/// A routing provider together with its request queue
pub struct ProviderSlot {
    id: ProviderId,
    port: Arc<dyn RoutingPort>,
    limiter: RateLimiter,
    concurrent_requests: bool,
}

impl fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("id", &self.id)
            .field("limiter", &self.limiter)
            .field("concurrent_requests", &self.concurrent_requests)
            .finish_non_exhaustive()
    }
}

impl ProviderSlot {
    /// Create a slot that sends the two party requests one after the other
    pub fn new(id: ProviderId, port: Arc<dyn RoutingPort>, limiter: RateLimiter) -> Self {
        Self {
            id,
            port,
            limiter,
            concurrent_requests: false,
        }
    }

    /// Allow both party requests of a candidate to be in flight together
    #[must_use]
    pub const fn with_concurrent_requests(mut self, concurrent: bool) -> Self {
        self.concurrent_requests = concurrent;
        self
    }

    pub const fn id(&self) -> &ProviderId {
        &self.id
    }

    pub const fn concurrent_requests(&self) -> bool {
        self.concurrent_requests
    }
}

/// Input of a resolution
///
/// Locations are raw `(latitude, longitude)` pairs; they are validated when
/// the resolution starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionRequest {
    pub origin: (f64, f64),
    pub destination: (f64, f64),
    pub user_mode: TravelMode,
    pub friend_mode: TravelMode,
    /// Departure time (None = now plus the configured offset)
    pub departure: Option<DateTime<Utc>>,
}

impl ResolutionRequest {
    /// Request with transit for both parties and the default departure
    #[must_use]
    pub const fn new(origin: (f64, f64), destination: (f64, f64)) -> Self {
        Self {
            origin,
            destination,
            user_mode: TravelMode::Transit,
            friend_mode: TravelMode::Transit,
            departure: None,
        }
    }

    #[must_use]
    pub const fn from_coordinates(origin: Coordinate, destination: Coordinate) -> Self {
        Self::new(
            (origin.latitude(), origin.longitude()),
            (destination.latitude(), destination.longitude()),
        )
    }

    /// Set per-party travel modes
    #[must_use]
    pub const fn with_modes(mut self, user_mode: TravelMode, friend_mode: TravelMode) -> Self {
        self.user_mode = user_mode;
        self.friend_mode = friend_mode;
        self
    }

    /// Set departure time
    #[must_use]
    pub const fn with_departure(mut self, departure: DateTime<Utc>) -> Self {
        self.departure = Some(departure);
        self
    }

    fn validated(&self) -> Result<(Coordinate, Coordinate), ApplicationError> {
        let origin = Coordinate::new(self.origin.0, self.origin.1)
            .map_err(|e| ApplicationError::InvalidInput(format!("origin: {e}")))?;
        let destination = Coordinate::new(self.destination.0, self.destination.1)
            .map_err(|e| ApplicationError::InvalidInput(format!("destination: {e}")))?;
        Ok((origin, destination))
    }
}

/// Validated per-resolution routing context
#[derive(Debug, Clone, Copy)]
struct Trip {
    origin: Coordinate,
    destination: Coordinate,
    user_mode: TravelMode,
    friend_mode: TravelMode,
    departure: DateTime<Utc>,
    distance_m: f64,
}

/// Successful evaluation of one candidate
struct CandidateRoutes {
    provider: ProviderId,
    user: RouteMetrics,
    friend: RouteMetrics,
}

/// Resolves a transit-balanced meeting point for two parties
pub struct MeetingPointService {
    providers: Vec<ProviderSlot>,
    ledger: Arc<BudgetLedger>,
    hubs: HubRegistry,
    scorer: Scorer,
    settings: EngineSettings,
    dead_providers: RwLock<HashSet<ProviderId>>,
}

impl fmt::Debug for MeetingPointService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeetingPointService")
            .field("providers", &self.providers)
            .field("hubs", &self.hubs.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl MeetingPointService {
    /// Create the service; providers are tried in the given order
    pub fn new(
        providers: Vec<ProviderSlot>,
        ledger: Arc<BudgetLedger>,
        hubs: HubRegistry,
        settings: EngineSettings,
    ) -> Self {
        Self {
            providers,
            ledger,
            hubs,
            scorer: Scorer::new(settings.weights),
            settings,
            dead_providers: RwLock::new(HashSet::new()),
        }
    }

    pub const fn ledger(&self) -> &Arc<BudgetLedger> {
        &self.ledger
    }

    pub const fn hubs(&self) -> &HubRegistry {
        &self.hubs
    }

    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Whether the provider has not been disabled by an authentication failure
    pub fn is_provider_alive(&self, provider_id: &ProviderId) -> bool {
        !self.dead_providers.read().contains(provider_id)
    }

    /// Providers disabled for the rest of the process
    pub fn dead_providers(&self) -> Vec<ProviderId> {
        let mut dead: Vec<ProviderId> = self.dead_providers.read().iter().cloned().collect();
        dead.sort();
        dead
    }

    /// Candidates for two parties: relevant hubs, or a ring around the midpoint
    pub fn candidates_for(&self, origin: Coordinate, destination: Coordinate) -> Vec<Candidate> {
        let hubs = self
            .hubs
            .filter_relevant(origin, destination, self.settings.max_hub_candidates);
        if !hubs.is_empty() {
            return hubs;
        }

        let distance_m = origin.distance_meters(&destination);
        let radius = self.settings.ring_radius_meters(distance_m);
        debug!(radius_m = radius, "No relevant hubs, generating ring candidates");
        generate_ring_candidates(
            spherical_midpoint(origin, destination),
            radius,
            self.settings.ring_candidate_count,
        )
    }

    /// Resolve a meeting point
    ///
    /// Always produces a coordinate for valid input. Provider calls are
    /// bounded by two per candidate plus one throttle retry each.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::InvalidInput` if either location is not a
    /// valid coordinate. No provider is contacted in that case.
    #[instrument(skip(self, request), fields(origin = ?request.origin, destination = ?request.destination))]
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<ResolutionResult, ApplicationError> {
        let mut state = ResolutionState::Init;
        advance(&mut state, ResolutionState::BudgetCheck);

        let (origin, destination) = request.validated()?;
        let midpoint = spherical_midpoint(origin, destination);
        let distance_m = origin.distance_meters(&destination);

        self.ledger.reset_if_new_month().await;

        let alive: Vec<&ProviderSlot> = self
            .providers
            .iter()
            .filter(|slot| self.is_provider_alive(&slot.id))
            .collect();
        if alive.is_empty() {
            info!("No usable routing provider");
            return Ok(fallback(&mut state, midpoint, FallbackReason::NoProviders, 0, Vec::new()));
        }
        if !alive
            .iter()
            .any(|slot| self.ledger.policy_allows(&slot.id, distance_m))
        {
            info!(distance_m, "Usage policy denies every provider");
            return Ok(fallback(&mut state, midpoint, FallbackReason::BudgetPolicy, 0, Vec::new()));
        }

        advance(&mut state, ResolutionState::CandidateEvaluation);
        let candidates = self.candidates_for(origin, destination);
        let trip = Trip {
            origin,
            destination,
            user_mode: request.user_mode,
            friend_mode: request.friend_mode,
            departure: request.departure.unwrap_or_else(|| {
                Utc::now() + chrono::Duration::minutes(self.settings.departure_offset_minutes)
            }),
            distance_m,
        };

        let mut selector = CandidateSelector::new();
        let mut winning_provider = None;
        let mut skipped = Vec::new();

        for candidate in &candidates {
            match self.evaluate_candidate(candidate, &trip).await {
                Ok(routes) => {
                    advance(&mut state, ResolutionState::Scoring);
                    let scored = self.scorer.evaluate(candidate.clone(), routes.user, routes.friend);
                    if selector.offer(scored) {
                        winning_provider = Some(routes.provider);
                    }
                },
                Err(reason) => skipped.push(SkippedCandidate {
                    label: candidate.label.clone(),
                    reason,
                }),
            }
        }

        let evaluated = candidates.len();
        match (selector.into_best(), winning_provider) {
            (Some(best), Some(provider)) => {
                advance(&mut state, ResolutionState::Selected);
                info!(
                    candidate = %best.candidate.label,
                    provider = %provider,
                    score = best.total(),
                    skipped = skipped.len(),
                    "Meeting point selected"
                );
                Ok(ResolutionResult::selected(&best, provider, evaluated, skipped))
            },
            _ => {
                warn!(
                    candidates = evaluated,
                    skipped = skipped.len(),
                    "No candidate could be evaluated"
                );
                Ok(fallback(
                    &mut state,
                    midpoint,
                    FallbackReason::AllCandidatesFailed,
                    evaluated,
                    skipped,
                ))
            },
        }
    }

    /// Route both parties to a candidate; `Err` carries the skip reason
    async fn evaluate_candidate(
        &self,
        candidate: &Candidate,
        trip: &Trip,
    ) -> Result<CandidateRoutes, String> {
        let Some(slot) = self.providers.iter().find(|slot| {
            self.is_provider_alive(&slot.id)
                && self.ledger.policy_allows(&slot.id, trip.distance_m)
                && self.ledger.can_consume(&slot.id, REQUESTS_PER_CANDIDATE)
        }) else {
            info!(candidate = %candidate.label, "Skipping candidate: no provider budget left");
            return Err(ProviderError::BudgetExceeded.to_string());
        };

        match self.route_pair(slot, candidate, trip).await {
            Ok((user, friend)) => Ok(CandidateRoutes {
                provider: slot.id.clone(),
                user,
                friend,
            }),
            Err(err) => {
                if err.is_provider_fatal() {
                    self.mark_dead(&slot.id, &err);
                }
                if matches!(err, ProviderError::BudgetExceeded) {
                    info!(candidate = %candidate.label, provider = %slot.id, "Skipping candidate: budget exceeded");
                } else {
                    warn!(
                        candidate = %candidate.label,
                        provider = %slot.id,
                        kind = err.kind(),
                        error = %err,
                        "Skipping candidate"
                    );
                }
                Err(err.to_string())
            },
        }
    }

    async fn route_pair(
        &self,
        slot: &ProviderSlot,
        candidate: &Candidate,
        trip: &Trip,
    ) -> Result<(RouteMetrics, RouteMetrics), ProviderError> {
        let user = RouteRequest::new(trip.origin, candidate.coordinate, trip.user_mode)
            .with_departure(trip.departure);
        let friend = RouteRequest::new(trip.destination, candidate.coordinate, trip.friend_mode)
            .with_departure(trip.departure);

        if slot.concurrent_requests {
            let (user, friend) = tokio::join!(self.dispatch(slot, &user), self.dispatch(slot, &friend));
            Ok((user?, friend?))
        } else {
            let user = self.dispatch(slot, &user).await?;
            let friend = self.dispatch(slot, &friend).await?;
            Ok((user, friend))
        }
    }

    /// Send one paced request, charging the ledger before each attempt
    async fn dispatch(
        &self,
        slot: &ProviderSlot,
        request: &RouteRequest,
    ) -> Result<RouteMetrics, ProviderError> {
        let timeout = self.settings.request_timeout;
        slot.limiter
            .dispatch(move || async move {
                self.ledger.try_consume(&slot.id, 1).await?;
                match tokio::time::timeout(timeout, slot.port.get_route(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Network(format!(
                        "request timed out after {}ms",
                        timeout.as_millis()
                    ))),
                }
            })
            .await
    }

    fn mark_dead(&self, provider_id: &ProviderId, err: &ProviderError) {
        if self.dead_providers.write().insert(provider_id.clone()) {
            error!(
                provider = %provider_id,
                error = %err,
                "Provider rejected credentials, disabled until restart"
            );
        }
    }
}

fn fallback(
    state: &mut ResolutionState,
    midpoint: Coordinate,
    reason: FallbackReason,
    evaluated: usize,
    skipped: Vec<SkippedCandidate>,
) -> ResolutionResult {
    advance(state, ResolutionState::GeographicFallback);
    info!(reason = %reason, midpoint = %midpoint, "Using geometric midpoint");
    ResolutionResult::geometric(midpoint, reason, evaluated, skipped)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::ports::MockRoutingPort;
    use crate::services::budget_ledger::ProviderQuota;
    use crate::services::rate_limiter::ThrottleRetryPolicy;

    const ORIGIN: (f64, f64) = (40.7580, -73.9855);
    const DESTINATION: (f64, f64) = (40.7359, -73.9906);

    type Responder = dyn Fn(&RouteRequest, usize) -> Result<RouteMetrics, ProviderError> + Send + Sync;

    /// Routing provider answering from a closure and recording every request
    struct ScriptedProvider {
        respond: Box<Responder>,
        requests: Mutex<Vec<RouteRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn new(
            respond: impl Fn(&RouteRequest, usize) -> Result<RouteMetrics, ProviderError>
            + Send
            + Sync
            + 'static,
        ) -> Arc<Self> {
            Self::with_delay(respond, None)
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Self::with_delay(|_, _| Ok(metrics(600.0)), Some(delay))
        }

        fn with_delay(
            respond: impl Fn(&RouteRequest, usize) -> Result<RouteMetrics, ProviderError>
            + Send
            + Sync
            + 'static,
            delay: Option<Duration>,
        ) -> Arc<Self> {
            Arc::new(Self {
                respond: Box::new(respond),
                requests: Mutex::new(Vec::new()),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl RoutingPort for ScriptedProvider {
        async fn get_route(&self, request: &RouteRequest) -> Result<RouteMetrics, ProviderError> {
            let call = {
                let mut requests = self.requests.lock();
                requests.push(*request);
                requests.len() - 1
            };
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.respond)(request, call)
        }
    }

    fn metrics(duration: f64) -> RouteMetrics {
        RouteMetrics::sanitized(Some(duration), Some(2500.0), 0)
    }

    fn pid(s: &str) -> ProviderId {
        ProviderId::new(s).unwrap()
    }

    fn origin() -> Coordinate {
        Coordinate::new(ORIGIN.0, ORIGIN.1).unwrap()
    }

    /// 600s for the user, 720s for the friend, at every candidate
    fn balanced_provider() -> Arc<ScriptedProvider> {
        let user_origin = origin();
        ScriptedProvider::new(move |req, _| {
            if req.origin == user_origin {
                Ok(metrics(600.0))
            } else {
                Ok(metrics(720.0))
            }
        })
    }

    fn ledger_with(providers: &[(&str, u64)]) -> Arc<BudgetLedger> {
        Arc::new(BudgetLedger::in_memory(providers.iter().map(|(id, cap)| {
            (pid(id), ProviderQuota::RequestCount { monthly_cap: *cap })
        })))
    }

    fn service_with(
        slots: Vec<ProviderSlot>,
        ledger: Arc<BudgetLedger>,
        settings: EngineSettings,
    ) -> MeetingPointService {
        MeetingPointService::new(slots, ledger, HubRegistry::builtin(), settings)
    }

    fn slot(id: &str, port: Arc<dyn RoutingPort>) -> ProviderSlot {
        ProviderSlot::new(pid(id), port, RateLimiter::unlimited())
    }

    fn midtown_midpoint() -> Coordinate {
        spherical_midpoint(origin(), Coordinate::new(DESTINATION.0, DESTINATION.1).unwrap())
    }

    #[tokio::test]
    async fn resolves_to_hub_when_budget_is_fresh() {
        let provider = balanced_provider();
        let ledger = ledger_with(&[("directions", 1000)]);
        let service = service_with(
            vec![slot("directions", provider.clone())],
            Arc::clone(&ledger),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        assert!(result.used_provider);
        assert!(
            service
                .hubs()
                .hubs()
                .iter()
                .any(|hub| hub.coordinate == result.coordinate)
        );
        // Equal routes everywhere, so the first major hub wins
        assert_eq!(result.candidate_label.as_deref(), Some("34 St-Herald Sq"));
        assert_eq!(result.provider, Some(pid("directions")));
        assert_eq!(result.candidates_evaluated, 5);
        assert!(result.skipped.is_empty());
        let breakdown = result.score_breakdown.unwrap();
        assert!((breakdown.total - 1320.0).abs() < 1e-9);
        assert_eq!(provider.calls(), 10);
        assert_eq!(ledger.status_of(&pid("directions")).unwrap().consumed_requests, 10);
    }

    #[tokio::test]
    async fn nearly_exhausted_budget_falls_back_without_network_calls() {
        let provider = balanced_provider();
        let ledger = ledger_with(&[("directions", 100)]);
        ledger.set_consumed(&pid("directions"), 96).await.unwrap();
        let service = service_with(
            vec![slot("directions", provider.clone())],
            Arc::clone(&ledger),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        assert!(!result.used_provider);
        assert_eq!(result.coordinate, midtown_midpoint());
        assert_eq!(result.fallback_reason, Some(FallbackReason::BudgetPolicy));
        assert_eq!(provider.calls(), 0);
        assert_eq!(ledger.status_of(&pid("directions")).unwrap().consumed_requests, 96);
    }

    #[tokio::test]
    async fn all_candidates_without_route_fall_back_to_midpoint() {
        let provider =
            ScriptedProvider::new(|_, _| Err(ProviderError::NoRoute("ZERO_RESULTS".to_string())));
        let ledger = ledger_with(&[("directions", 1000)]);
        let service = service_with(
            vec![slot("directions", provider.clone())],
            Arc::clone(&ledger),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        assert!(!result.used_provider);
        assert_eq!(result.coordinate, midtown_midpoint());
        assert_eq!(result.fallback_reason, Some(FallbackReason::AllCandidatesFailed));
        assert_eq!(result.candidates_evaluated, 5);
        assert_eq!(result.skipped.len(), 5);
        assert!(result.skipped.iter().all(|s| s.reason.contains("No route")));
        // Sequential provider: the friend request is never sent after the user request fails
        assert_eq!(provider.calls(), 5);
        // A provider that answered "no route" still billed the request
        assert_eq!(ledger.status_of(&pid("directions")).unwrap().consumed_requests, 5);
    }

    #[tokio::test]
    async fn undecodable_responses_stay_charged() {
        let user_origin = origin();
        let provider = ScriptedProvider::new(move |req, _| {
            if req.origin == user_origin {
                Ok(metrics(600.0))
            } else {
                Err(ProviderError::Parse("missing legs".to_string()))
            }
        });
        let ledger = ledger_with(&[("directions", 1000)]);
        let service = service_with(
            vec![slot("directions", provider.clone())],
            Arc::clone(&ledger),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        assert!(!result.used_provider);
        assert_eq!(result.fallback_reason, Some(FallbackReason::AllCandidatesFailed));
        assert!(result.skipped.iter().all(|s| s.reason.contains("Parse error")));
        assert_eq!(provider.calls(), 10);
        assert_eq!(ledger.status_of(&pid("directions")).unwrap().consumed_requests, 10);
    }

    #[tokio::test]
    async fn invalid_input_is_the_only_surfaced_error() {
        let provider = balanced_provider();
        let service = service_with(
            vec![slot("directions", provider.clone())],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );

        let err = service
            .resolve(&ResolutionRequest::new((91.0, 0.0), DESTINATION))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidInput(_)));
        assert!(err.to_string().contains("check input locations"));

        let err = service
            .resolve(&ResolutionRequest::new(ORIGIN, (0.0, f64::NAN)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("destination"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn auth_failure_disables_provider_for_later_candidates() {
        let broken = ScriptedProvider::new(|_, _| Err(ProviderError::Auth("REQUEST_DENIED".to_string())));
        let backup = balanced_provider();
        let service = service_with(
            vec![slot("directions", broken.clone()), slot("hafas", backup.clone())],
            ledger_with(&[("directions", 1000), ("hafas", 1000)]),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        assert!(result.used_provider);
        assert_eq!(result.provider, Some(pid("hafas")));
        assert_eq!(broken.calls(), 1);
        assert_eq!(backup.calls(), 8);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].label, "34 St-Herald Sq");
        assert!(!service.is_provider_alive(&pid("directions")));
        assert_eq!(service.dead_providers(), vec![pid("directions")]);

        // The next resolution never touches the dead provider
        service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();
        assert_eq!(broken.calls(), 1);
    }

    #[tokio::test]
    async fn only_dead_providers_means_no_providers() {
        let broken = ScriptedProvider::new(|_, _| Err(ProviderError::Auth("invalid key".to_string())));
        let service = service_with(
            vec![slot("directions", broken.clone())],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );
        let request = ResolutionRequest::new(ORIGIN, DESTINATION);

        let first = service.resolve(&request).await.unwrap();
        assert_eq!(first.fallback_reason, Some(FallbackReason::AllCandidatesFailed));

        let second = service.resolve(&request).await.unwrap();
        assert_eq!(second.fallback_reason, Some(FallbackReason::NoProviders));
        assert_eq!(broken.calls(), 1);
    }

    #[tokio::test]
    async fn no_configured_provider_falls_back() {
        let service = service_with(Vec::new(), ledger_with(&[]), EngineSettings::default());
        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();
        assert_eq!(result.fallback_reason, Some(FallbackReason::NoProviders));
        assert_eq!(result.coordinate, midtown_midpoint());
    }

    #[tokio::test]
    async fn exhausted_budget_stops_network_calls_mid_resolution() {
        let provider = balanced_provider();
        let ledger = ledger_with(&[("directions", 4)]);
        let service = service_with(
            vec![slot("directions", provider.clone())],
            Arc::clone(&ledger),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        // Two candidates fit into the allowance, the remaining three are skipped
        assert!(result.used_provider);
        assert_eq!(provider.calls(), 4);
        assert_eq!(result.skipped.len(), 3);
        assert!(result.skipped.iter().all(|s| s.reason == "Budget exceeded"));
        assert!(!ledger.can_consume(&pid("directions"), 1));

        let again = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();
        assert!(!again.used_provider);
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test]
    async fn network_errors_are_swallowed() {
        let mut port = MockRoutingPort::new();
        port.expect_get_route()
            .returning(|_| Err(ProviderError::Network("connection reset".to_string())));
        let service = service_with(
            vec![slot("directions", Arc::new(port))],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();
        assert!(!result.used_provider);
        assert_eq!(result.fallback_reason, Some(FallbackReason::AllCandidatesFailed));
        assert!(service.is_provider_alive(&pid("directions")));
    }

    #[tokio::test]
    async fn cheaper_candidate_wins() {
        // Penn Station is balanced, every other candidate is lopsided
        let penn = Coordinate::new_unchecked(40.7506, -73.9935);
        let user_origin = origin();
        let provider = ScriptedProvider::new(move |req, _| {
            if req.destination == penn {
                Ok(metrics(650.0))
            } else if req.origin == user_origin {
                Ok(metrics(300.0))
            } else {
                Ok(metrics(1200.0))
            }
        });
        let service = service_with(
            vec![slot("directions", provider)],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();
        assert_eq!(result.candidate_label.as_deref(), Some("Penn Station"));
        assert_eq!(result.coordinate, penn);
    }

    #[tokio::test]
    async fn ring_candidates_used_when_no_hub_is_relevant() {
        let provider = ScriptedProvider::new(|_, _| Ok(metrics(900.0)));
        let service = service_with(
            vec![slot("directions", provider.clone())],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new((10.0, 10.0), (10.03, 10.03)))
            .await
            .unwrap();

        assert!(result.used_provider);
        assert!(result.candidate_label.unwrap().starts_with("Ring 1/6"));
        assert_eq!(result.candidates_evaluated, DEFAULT_RING_CANDIDATE_COUNT);
        assert_eq!(provider.calls(), 2 * DEFAULT_RING_CANDIDATE_COUNT);
    }

    #[tokio::test]
    async fn concurrent_provider_sends_both_requests() {
        let provider =
            ScriptedProvider::new(|_, _| Err(ProviderError::NoRoute("no transit".to_string())));
        let service = service_with(
            vec![slot("directions", provider.clone()).with_concurrent_requests(true)],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );

        service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();
        assert_eq!(provider.calls(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_count_as_network_errors() {
        let provider = ScriptedProvider::slow(Duration::from_secs(60));
        let settings = EngineSettings {
            request_timeout: Duration::from_secs(1),
            ..EngineSettings::default()
        };
        let service = service_with(
            vec![slot("directions", provider.clone())],
            ledger_with(&[("directions", 1000)]),
            settings,
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();
        assert!(!result.used_provider);
        assert!(result.skipped.iter().all(|s| s.reason.contains("timed out")));
        assert_eq!(provider.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_resolution_keeps_dispatched_charges() {
        let provider = ScriptedProvider::slow(Duration::from_secs(10));
        let settings = EngineSettings {
            request_timeout: Duration::from_secs(30),
            ..EngineSettings::default()
        };
        let ledger = ledger_with(&[("directions", 1000)]);
        let service = service_with(
            vec![slot("directions", provider.clone())],
            Arc::clone(&ledger),
            settings,
        );

        // Dropped while the first candidate's user leg is still in flight
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            service.resolve(&ResolutionRequest::new(ORIGIN, DESTINATION)),
        )
        .await;
        assert!(outcome.is_err());

        assert_eq!(provider.calls(), 1);
        assert_eq!(ledger.status_of(&pid("directions")).unwrap().consumed_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_request_is_retried_and_charged_twice() {
        let user_origin = origin();
        let provider = ScriptedProvider::new(move |req, call| {
            if call == 0 {
                Err(ProviderError::RateLimited {
                    retry_after_secs: None,
                })
            } else if req.origin == user_origin {
                Ok(metrics(600.0))
            } else {
                Ok(metrics(720.0))
            }
        });
        let ledger = ledger_with(&[("directions", 1000)]);
        let limiter = RateLimiter::new(
            Duration::from_millis(500),
            ThrottleRetryPolicy::single(Duration::from_secs(2)),
        );
        let service = service_with(
            vec![ProviderSlot::new(pid("directions"), provider.clone(), limiter)],
            Arc::clone(&ledger),
            EngineSettings::default(),
        );

        let result = service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        assert!(result.used_provider);
        assert!(result.skipped.is_empty());
        assert_eq!(provider.calls(), 11);
        assert_eq!(ledger.status_of(&pid("directions")).unwrap().consumed_requests, 11);
    }

    #[tokio::test]
    async fn default_departure_is_in_the_future() {
        let provider = balanced_provider();
        let service = service_with(
            vec![slot("directions", provider.clone())],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );
        let before = Utc::now();

        service
            .resolve(&ResolutionRequest::new(ORIGIN, DESTINATION))
            .await
            .unwrap();

        let requests = provider.requests.lock();
        let departure = requests[0].departure.unwrap();
        assert!(departure >= before + chrono::Duration::minutes(4));
        assert!(requests.iter().all(|r| r.departure == Some(departure)));
    }

    #[tokio::test]
    async fn modes_and_departure_are_forwarded() {
        let provider = balanced_provider();
        let service = service_with(
            vec![slot("directions", provider.clone())],
            ledger_with(&[("directions", 1000)]),
            EngineSettings::default(),
        );
        let departure = Utc::now() + chrono::Duration::hours(2);

        service
            .resolve(
                &ResolutionRequest::new(ORIGIN, DESTINATION)
                    .with_modes(TravelMode::Walking, TravelMode::Bicycling)
                    .with_departure(departure),
            )
            .await
            .unwrap();

        let requests = provider.requests.lock();
        let user_origin = origin();
        for r in requests.iter() {
            assert_eq!(r.departure, Some(departure));
            if r.origin == user_origin {
                assert_eq!(r.mode, TravelMode::Walking);
            } else {
                assert_eq!(r.mode, TravelMode::Bicycling);
            }
        }
    }

    #[test]
    fn ring_radius_is_clamped() {
        let settings = EngineSettings::default();
        assert!((settings.ring_radius_meters(100.0) - MIN_RING_RADIUS_METERS).abs() < f64::EPSILON);
        assert!((settings.ring_radius_meters(4000.0) - 1000.0).abs() < 1e-9);
        assert!((settings.ring_radius_meters(100_000.0) - MAX_RING_RADIUS_METERS).abs() < f64::EPSILON);
    }

    #[test]
    fn terminal_states() {
        assert!(ResolutionState::Selected.is_terminal());
        assert!(ResolutionState::GeographicFallback.is_terminal());
        assert!(!ResolutionState::Scoring.is_terminal());
        assert_eq!(ResolutionState::BudgetCheck.to_string(), "budget_check");
    }
}
