//! Directions API client
//!
//! Talks to a Google-Directions-compatible endpoint (`/json`). The endpoint
//! reports most failures in-band through a `status` field on an HTTP 200
//! response, so both layers are checked.

use async_trait::async_trait;
use domain::{Coordinate, TravelMode};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::client::{RouteQuery, RoutingClient, build_http_client, fetch_body};
use crate::config::RoutingClientConfig;
use crate::error::RoutingError;
use crate::models::{NormalizedRoute, RouteResponse};
use crate::sanitize::{lenient_f64, sum_quantities, transfers_from_segments, waypoint};

/// Client for the Directions API
#[derive(Debug)]
pub struct DirectionsClient {
    client: Client,
    config: RoutingClientConfig,
}

impl DirectionsClient {
    /// Create a new Directions client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, no API key is set,
    /// or the HTTP client cannot be initialized.
    pub fn new(config: &RoutingClientConfig) -> Result<Self, RoutingError> {
        if config.api_key.is_none() {
            return Err(RoutingError::ConfigurationError(
                "Directions API requires an api_key".to_string(),
            ));
        }

        Ok(Self {
            client: build_http_client(config)?,
            config: config.clone(),
        })
    }

    fn query_params(&self, query: &RouteQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("origin", query.origin.to_string()),
            ("destination", query.destination.to_string()),
            ("mode", query.mode.as_str().to_string()),
            ("alternatives", self.config.alternatives.to_string()),
            (
                "departure_time",
                query.effective_departure().timestamp().to_string(),
            ),
        ];
        if let Some(key) = &self.config.api_key {
            params.push(("key", key.clone()));
        }
        params
    }

    /// Parse a Directions response body into the canonical schema
    fn parse_response(body: &str, query: &RouteQuery) -> Result<RouteResponse, RoutingError> {
        let raw: RawDirectionsResponse =
            serde_json::from_str(body).map_err(|e| RoutingError::ParseError(e.to_string()))?;

        let detail = || {
            raw.error_message
                .clone()
                .unwrap_or_else(|| raw.status.clone())
        };

        match raw.status.as_str() {
            "OK" => {},
            "ZERO_RESULTS" | "NOT_FOUND" => return Err(query.no_route()),
            "REQUEST_DENIED" => return Err(RoutingError::AuthenticationFailed(detail())),
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
                return Err(RoutingError::RateLimitExceeded {
                    retry_after_secs: None,
                });
            },
            "UNKNOWN_ERROR" => return Err(RoutingError::ServiceUnavailable(detail())),
            _ => return Err(RoutingError::RequestFailed(detail())),
        }

        let routes: Vec<NormalizedRoute> = raw.routes.iter().map(Self::convert_route).collect();
        if routes.is_empty() {
            return Err(query.no_route());
        }
        Ok(RouteResponse::ok(routes))
    }

    fn convert_route(raw: &RawRoute) -> NormalizedRoute {
        let durations: Vec<Option<f64>> = raw
            .legs
            .iter()
            .map(|leg| leg.duration.as_ref().and_then(|d| lenient_f64(d.value.as_ref())))
            .collect();
        let distances: Vec<Option<f64>> = raw
            .legs
            .iter()
            .map(|leg| leg.distance.as_ref().and_then(|d| lenient_f64(d.value.as_ref())))
            .collect();

        let steps = || raw.legs.iter().flat_map(|leg| leg.steps.iter());

        let transit_steps = steps()
            .filter(|step| step.travel_mode.eq_ignore_ascii_case("TRANSIT"))
            .count();

        let waypoints: Vec<Coordinate> = steps()
            .filter_map(|step| step.start_location.as_ref())
            .chain(raw.legs.last().and_then(|leg| leg.end_location.as_ref()))
            .filter_map(RawLatLng::to_coordinate)
            .collect();

        let summary = if raw.summary.trim().is_empty() {
            steps()
                .filter_map(|step| step.transit_details.as_ref())
                .filter_map(|details| details.line.as_ref())
                .filter_map(RawTransitLine::display_name)
                .collect::<Vec<_>>()
                .join(" → ")
        } else {
            raw.summary.clone()
        };

        NormalizedRoute::from_untrusted(
            sum_quantities(&durations),
            sum_quantities(&distances),
            transfers_from_segments(transit_steps),
            summary,
            waypoints,
        )
    }
}

#[async_trait]
impl RoutingClient for DirectionsClient {
    fn provider_name(&self) -> &'static str {
        "directions"
    }

    fn supports_mode(&self, _mode: TravelMode) -> bool {
        true
    }

    #[instrument(skip(self), fields(from = %query.origin, to = %query.destination, mode = %query.mode))]
    async fn route(&self, query: &RouteQuery) -> Result<RouteResponse, RoutingError> {
        let url = format!("{}/json", self.config.trimmed_base_url());

        debug!(?url, "Requesting directions");

        let request = self.client.get(&url).query(&self.query_params(query));
        let body = fetch_body(request, self.config.timeout_secs).await?;

        let result = Self::parse_response(&body, query);
        match &result {
            Ok(response) => debug!(count = response.routes.len(), "Directions found"),
            Err(e) => warn!(error = %e, "Directions request unsuccessful"),
        }
        result
    }
}

// --- Raw API response types for deserialization ---

#[derive(Debug, Deserialize)]
struct RawDirectionsResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    routes: Vec<RawRoute>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    legs: Vec<RawLeg>,
}

#[derive(Debug, Deserialize)]
struct RawLeg {
    duration: Option<RawValue>,
    distance: Option<RawValue>,
    end_location: Option<RawLatLng>,
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    travel_mode: String,
    start_location: Option<RawLatLng>,
    transit_details: Option<RawTransitDetails>,
}

#[derive(Debug, Deserialize)]
struct RawLatLng {
    lat: Option<Value>,
    lng: Option<Value>,
}

impl RawLatLng {
    fn to_coordinate(&self) -> Option<Coordinate> {
        waypoint(self.lat.as_ref(), self.lng.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct RawTransitDetails {
    line: Option<RawTransitLine>,
}

#[derive(Debug, Deserialize)]
struct RawTransitLine {
    short_name: Option<String>,
    name: Option<String>,
}

impl RawTransitLine {
    fn display_name(&self) -> Option<String> {
        self.short_name
            .as_ref()
            .or(self.name.as_ref())
            .filter(|name| !name.trim().is_empty())
            .cloned()
    }
}
