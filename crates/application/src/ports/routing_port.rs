//! Routing provider port
//!
//! Defines the provider-agnostic interface used to obtain route metrics.
//! Adapters in the infrastructure layer implement this port over the HTTP
//! clients of each routing provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Coordinate, RouteMetrics, TravelMode};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Failure modes of a single routing request
///
/// Only `Auth` is fatal for a provider; every other variant skips the
/// candidate that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Connection failure, timeout or server-side error
    #[error("Network error: {0}")]
    Network(String),

    /// Credential rejected
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// Provider asked us to slow down
    #[error("Rate limited by provider")]
    RateLimited {
        /// Delay suggested by the provider, if any
        retry_after_secs: Option<u64>,
    },

    /// No itinerary exists for this request
    #[error("No route: {0}")]
    NoRoute(String),

    /// Monthly budget does not allow another request
    #[error("Budget exceeded")]
    BudgetExceeded,

    /// Response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether the provider must not be used again for the process lifetime
    pub const fn is_provider_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Whether this is a throttling signal eligible for a backoff retry
    pub const fn is_throttle(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Short stable label for logs and metrics
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::RateLimited { .. } => "rate_limited",
            Self::NoRoute(_) => "no_route",
            Self::BudgetExceeded => "budget_exceeded",
            Self::Parse(_) => "parse",
        }
    }
}

/// A single-party routing query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    /// Where the party starts
    pub origin: Coordinate,
    /// Candidate meeting point
    pub destination: Coordinate,
    /// Preferred way of travelling
    pub mode: TravelMode,
    /// Departure time (None = provider default of now + 5 minutes)
    pub departure: Option<DateTime<Utc>>,
}

impl RouteRequest {
    /// Create a request departing at the provider default time
    #[must_use]
    pub const fn new(origin: Coordinate, destination: Coordinate, mode: TravelMode) -> Self {
        Self {
            origin,
            destination,
            mode,
            departure: None,
        }
    }

    /// Set departure time
    #[must_use]
    pub const fn with_departure(mut self, departure: DateTime<Utc>) -> Self {
        self.departure = Some(departure);
        self
    }
}

/// Port for routing providers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoutingPort: Send + Sync {
    /// Fetch metrics of the provider's recommended route
    async fn get_route(&self, request: &RouteRequest) -> Result<RouteMetrics, ProviderError>;
}
