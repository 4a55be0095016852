//! Canonical route schema shared by all providers

use domain::{Coordinate, RouteMetrics};
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// Outcome of a routing call in the canonical schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    /// At least one route was found
    Ok,
    /// The provider found no route
    NoRoute,
    /// The call failed
    Error,
}

/// A single itinerary normalized from any provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRoute {
    /// Door-to-door duration in seconds
    pub duration_seconds: f64,
    /// Travelled distance in meters
    pub distance_meters: f64,
    /// Vehicle changes
    pub transfer_count: u32,
    /// Short human-readable description
    #[serde(default)]
    pub summary: String,
    /// Points along the route
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Coordinate>,
}

impl NormalizedRoute {
    /// Build a route from untrusted values, substituting safe defaults
    pub fn from_untrusted(
        duration_seconds: Option<f64>,
        distance_meters: Option<f64>,
        transfer_count: u32,
        summary: impl Into<String>,
        waypoints: Vec<Coordinate>,
    ) -> Self {
        let metrics = RouteMetrics::sanitized(duration_seconds, distance_meters, transfer_count);
        Self {
            duration_seconds: metrics.duration_seconds(),
            distance_meters: metrics.distance_meters(),
            transfer_count: metrics.transfer_count(),
            summary: summary.into(),
            waypoints,
        }
    }

    /// Metrics consumed by the scorer
    #[must_use]
    pub fn metrics(&self) -> RouteMetrics {
        RouteMetrics::sanitized(
            Some(self.duration_seconds),
            Some(self.distance_meters),
            self.transfer_count,
        )
    }
}

/// Provider-independent response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    /// Status of the call
    pub status: RouteStatus,
    /// Routes, best first
    #[serde(default)]
    pub routes: Vec<NormalizedRoute>,
    /// Error description for non-OK statuses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RouteResponse {
    /// Successful response
    #[must_use]
    pub const fn ok(routes: Vec<NormalizedRoute>) -> Self {
        Self {
            status: RouteStatus::Ok,
            routes,
            error_message: None,
        }
    }

    /// Describe a failed call in the canonical schema
    #[must_use]
    pub fn from_error(error: &RoutingError) -> Self {
        let status = if error.is_no_route() {
            RouteStatus::NoRoute
        } else {
            RouteStatus::Error
        };
        Self {
            status,
            routes: Vec::new(),
            error_message: Some(error.to_string()),
        }
    }

    /// The first (preferred) route
    #[must_use]
    pub fn primary(&self) -> Option<&NormalizedRoute> {
        self.routes.first()
    }
}
