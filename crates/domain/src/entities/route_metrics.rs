//! Normalized route metrics entity

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Duration substituted when a provider reports a missing or corrupt value
pub const DEFAULT_DURATION_SECONDS: f64 = 1800.0;

/// Distance substituted when a provider reports a missing or corrupt value
pub const DEFAULT_DISTANCE_METERS: f64 = 5000.0;

/// Summary of one itinerary: duration, distance and transfers
///
/// Invariant: duration and distance are finite and non-negative. The only
/// constructors either reject bad values ([`RouteMetrics::try_new`]) or
/// replace them with the documented defaults ([`RouteMetrics::sanitized`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteMetrics {
    duration_seconds: f64,
    distance_meters: f64,
    transfer_count: u32,
}

impl RouteMetrics {
    /// Create metrics from trusted values
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidRouteMetrics` if duration or distance is
    /// NaN, infinite or negative.
    pub fn try_new(
        duration_seconds: f64,
        distance_meters: f64,
        transfer_count: u32,
    ) -> Result<Self, DomainError> {
        if !is_valid_quantity(duration_seconds) {
            return Err(DomainError::InvalidRouteMetrics(format!(
                "duration {duration_seconds}"
            )));
        }
        if !is_valid_quantity(distance_meters) {
            return Err(DomainError::InvalidRouteMetrics(format!(
                "distance {distance_meters}"
            )));
        }
        Ok(Self {
            duration_seconds,
            distance_meters,
            transfer_count,
        })
    }

    /// Create metrics from untrusted provider values
    ///
    /// Missing, NaN, infinite or negative values are replaced by
    /// [`DEFAULT_DURATION_SECONDS`] / [`DEFAULT_DISTANCE_METERS`].
    #[must_use]
    pub fn sanitized(
        duration_seconds: Option<f64>,
        distance_meters: Option<f64>,
        transfer_count: u32,
    ) -> Self {
        Self {
            duration_seconds: duration_seconds
                .filter(|v| is_valid_quantity(*v))
                .unwrap_or(DEFAULT_DURATION_SECONDS),
            distance_meters: distance_meters
                .filter(|v| is_valid_quantity(*v))
                .unwrap_or(DEFAULT_DISTANCE_METERS),
            transfer_count,
        }
    }

    /// Total travel time in seconds
    #[must_use]
    pub const fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Total travel distance in meters
    #[must_use]
    pub const fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    /// Number of vehicle changes (first boarding excluded)
    #[must_use]
    pub const fn transfer_count(&self) -> u32 {
        self.transfer_count
    }
}

fn is_valid_quantity(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
