//! Routing client trait and shared HTTP plumbing

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Coordinate, TravelMode};
use reqwest::{Client, RequestBuilder, StatusCode};

use crate::config::RoutingClientConfig;
use crate::error::RoutingError;
use crate::models::RouteResponse;

/// Minutes after "now" used as departure when the caller gives none
pub const DEFAULT_DEPARTURE_OFFSET_MINUTES: i64 = 5;

/// One origin/destination pair to route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteQuery {
    /// Start of the trip
    pub origin: Coordinate,
    /// End of the trip
    pub destination: Coordinate,
    /// Travel mode
    pub mode: TravelMode,
    /// Requested departure time
    pub departure: Option<DateTime<Utc>>,
}

impl RouteQuery {
    /// Create a query departing at the default offset from now
    #[must_use]
    pub const fn new(origin: Coordinate, destination: Coordinate, mode: TravelMode) -> Self {
        Self {
            origin,
            destination,
            mode,
            departure: None,
        }
    }

    /// Set an explicit departure time
    #[must_use]
    pub const fn with_departure(mut self, departure: DateTime<Utc>) -> Self {
        self.departure = Some(departure);
        self
    }

    /// The departure actually sent to the provider
    #[must_use]
    pub fn effective_departure(&self) -> DateTime<Utc> {
        self.departure
            .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(DEFAULT_DEPARTURE_OFFSET_MINUTES))
    }

    pub(crate) fn no_route(&self) -> RoutingError {
        RoutingError::NoRoutesFound {
            from: self.origin.to_string(),
            to: self.destination.to_string(),
        }
    }
}

/// A routing provider returning routes in the canonical schema
#[async_trait]
pub trait RoutingClient: Send + Sync {
    /// Short provider name used in logs
    fn provider_name(&self) -> &'static str;

    /// Whether the provider can route with `mode`
    fn supports_mode(&self, mode: TravelMode) -> bool;

    /// Fetch routes for a query
    ///
    /// A successful result always carries at least one route; "nothing
    /// found" is reported as [`RoutingError::NoRoutesFound`].
    async fn route(&self, query: &RouteQuery) -> Result<RouteResponse, RoutingError>;
}

pub(crate) fn build_http_client(config: &RoutingClientConfig) -> Result<Client, RoutingError> {
    config.validate().map_err(RoutingError::ConfigurationError)?;

    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("Rendezvous/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RoutingError::ConnectionFailed(e.to_string()))
}

/// Send a request and return the body of a successful response
pub(crate) async fn fetch_body(
    request: RequestBuilder,
    timeout_secs: u64,
) -> Result<String, RoutingError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            RoutingError::Timeout { timeout_secs }
        } else {
            RoutingError::ConnectionFailed(e.to_string())
        }
    })?;

    let status = response.status();
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(RoutingError::RateLimitExceeded {
                retry_after_secs: response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok()),
            });
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(RoutingError::AuthenticationFailed(format!("HTTP {status}")));
        },
        s if s.is_server_error() => {
            return Err(RoutingError::ServiceUnavailable(format!("HTTP {status}")));
        },
        s if !s.is_success() => {
            return Err(RoutingError::RequestFailed(format!("HTTP {status}")));
        },
        _ => {},
    }

    response
        .text()
        .await
        .map_err(|e| RoutingError::ParseError(e.to_string()))
}
