//! HAFAS client via the transport.rest API
//!
//! Journey planning over [v6.db.transport.rest](https://v6.db.transport.rest).
//! HAFAS only plans public transport; walking-only trips are requested by
//! disabling every product.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Coordinate, TravelMode};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::client::{RouteQuery, RoutingClient, build_http_client, fetch_body};
use crate::config::RoutingClientConfig;
use crate::error::RoutingError;
use crate::models::{NormalizedRoute, RouteResponse};
use crate::sanitize::{lenient_f64, quantity, transfers_from_segments, waypoint};

const PRODUCTS: [&str; 9] = [
    "bus",
    "suburban",
    "subway",
    "tram",
    "ferry",
    "taxi",
    "regional",
    "national",
    "nationalExpress",
];

/// HAFAS-based routing client using the transport.rest API
#[derive(Debug)]
pub struct HafasClient {
    client: Client,
    config: RoutingClientConfig,
}

impl HafasClient {
    /// Create a new HAFAS client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &RoutingClientConfig) -> Result<Self, RoutingError> {
        Ok(Self {
            client: build_http_client(config)?,
            config: config.clone(),
        })
    }

    fn query_params(&self, query: &RouteQuery) -> Vec<(&'static str, String)> {
        let (from, to) = (query.origin, query.destination);
        let results = if self.config.alternatives { 3 } else { 1 };

        let mut params = vec![
            ("from.latitude", from.latitude().to_string()),
            ("from.longitude", from.longitude().to_string()),
            ("from.address", from.to_string()),
            ("to.latitude", to.latitude().to_string()),
            ("to.longitude", to.longitude().to_string()),
            ("to.address", to.to_string()),
            ("results", results.to_string()),
            ("departure", query.effective_departure().to_rfc3339()),
            ("stopovers", "false".to_string()),
            ("remarks", "false".to_string()),
        ];

        if query.mode == TravelMode::Walking {
            params.extend(PRODUCTS.iter().map(|product| (*product, "false".to_string())));
        }

        if let Some(key) = &self.config.api_key {
            params.push(("accessId", key.clone()));
        }
        params
    }

    /// Parse a journeys response body into the canonical schema
    fn parse_response(body: &str, query: &RouteQuery) -> Result<RouteResponse, RoutingError> {
        let raw: RawJourneysResponse =
            serde_json::from_str(body).map_err(|e| RoutingError::ParseError(e.to_string()))?;

        let routes: Vec<NormalizedRoute> = raw
            .journeys
            .iter()
            .filter(|journey| !journey.legs.is_empty())
            .map(Self::convert_journey)
            .collect();

        if routes.is_empty() {
            return Err(query.no_route());
        }
        Ok(RouteResponse::ok(routes))
    }

    fn convert_journey(raw: &RawJourney) -> NormalizedRoute {
        let departure = raw.legs.first().and_then(RawLeg::departure_time);
        let arrival = raw.legs.last().and_then(RawLeg::arrival_time);
        #[allow(clippy::cast_precision_loss)]
        let duration = departure
            .zip(arrival)
            .map(|(dep, arr)| (arr - dep).num_seconds() as f64);

        let distance = raw
            .legs
            .iter()
            .map(RawLeg::distance_meters)
            .sum::<Option<f64>>();

        let vehicle_legs: Vec<&RawLeg> = raw.legs.iter().filter(|leg| !leg.walking).collect();

        let waypoints: Vec<Coordinate> = raw
            .legs
            .iter()
            .filter_map(|leg| leg.origin.as_ref())
            .chain(raw.legs.last().and_then(|leg| leg.destination.as_ref()))
            .filter_map(RawStop::coordinate)
            .collect();

        let summary = if vehicle_legs.is_empty() {
            "walk".to_string()
        } else {
            vehicle_legs
                .iter()
                .filter_map(|leg| leg.line.as_ref().and_then(|line| line.name.clone()))
                .collect::<Vec<_>>()
                .join(" → ")
        };

        NormalizedRoute::from_untrusted(
            duration,
            distance,
            transfers_from_segments(vehicle_legs.len()),
            summary,
            waypoints,
        )
    }
}

#[async_trait]
impl RoutingClient for HafasClient {
    fn provider_name(&self) -> &'static str {
        "hafas"
    }

    fn supports_mode(&self, mode: TravelMode) -> bool {
        matches!(mode, TravelMode::Transit | TravelMode::Walking)
    }

    #[instrument(skip(self), fields(from = %query.origin, to = %query.destination, mode = %query.mode))]
    async fn route(&self, query: &RouteQuery) -> Result<RouteResponse, RoutingError> {
        if !self.supports_mode(query.mode) {
            return Err(RoutingError::UnsupportedMode(query.mode.to_string()));
        }

        let url = format!("{}/journeys", self.config.trimmed_base_url());

        debug!(?url, "Searching journeys");

        let request = self.client.get(&url).query(&self.query_params(query));
        let body = fetch_body(request, self.config.timeout_secs).await?;

        let result = Self::parse_response(&body, query);
        match &result {
            Ok(response) => debug!(count = response.routes.len(), "Journeys found"),
            Err(e) => warn!(error = %e, "No usable journeys"),
        }
        result
    }
}

// --- Raw API response types for deserialization ---

#[derive(Debug, Deserialize)]
struct RawJourneysResponse {
    #[serde(default)]
    journeys: Vec<RawJourney>,
}

#[derive(Debug, Deserialize)]
struct RawJourney {
    #[serde(default)]
    legs: Vec<RawLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLeg {
    origin: Option<RawStop>,
    destination: Option<RawStop>,
    departure: Option<String>,
    planned_departure: Option<String>,
    arrival: Option<String>,
    planned_arrival: Option<String>,
    line: Option<RawLine>,
    #[serde(default)]
    walking: bool,
    distance: Option<Value>,
}

impl RawLeg {
    fn departure_time(&self) -> Option<DateTime<Utc>> {
        parse_time(self.departure.as_deref()).or_else(|| parse_time(self.planned_departure.as_deref()))
    }

    fn arrival_time(&self) -> Option<DateTime<Utc>> {
        parse_time(self.arrival.as_deref()).or_else(|| parse_time(self.planned_arrival.as_deref()))
    }

    /// Reported distance, or the straight line between the leg's stops
    fn distance_meters(&self) -> Option<f64> {
        quantity(lenient_f64(self.distance.as_ref())).or_else(|| {
            let from = self.origin.as_ref()?.coordinate()?;
            let to = self.destination.as_ref()?.coordinate()?;
            Some(from.distance_meters(&to))
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawStop {
    location: Option<RawLocation>,
}

impl RawStop {
    fn coordinate(&self) -> Option<Coordinate> {
        let location = self.location.as_ref()?;
        waypoint(location.latitude.as_ref(), location.longitude.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    latitude: Option<Value>,
    longitude: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawLine {
    name: Option<String>,
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
