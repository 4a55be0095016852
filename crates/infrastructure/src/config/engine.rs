//! Resolution engine tuning.

use std::time::Duration;

use application::{
    ApplicationError, DEFAULT_DEPARTURE_OFFSET_MINUTES, DEFAULT_FAIRNESS_WEIGHT,
    DEFAULT_MAJOR_HUB_BONUS_SECS, DEFAULT_MAX_HUB_CANDIDATES, DEFAULT_RING_CANDIDATE_COUNT,
    DEFAULT_RING_RADIUS_FRACTION, DEFAULT_TRANSFER_PENALTY_SECS, EngineSettings, ScoringWeights,
};
use serde::{Deserialize, Serialize};

/// Engine configuration as read from file/environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineAppConfig {
    /// Maximum number of hubs evaluated per resolution (default: 5)
    #[serde(default = "default_max_hub_candidates")]
    pub max_hub_candidates: usize,

    /// Exponent applied to the travel-time imbalance, within [2, 3] (default: 2.5)
    #[serde(default = "default_fairness_weight")]
    pub fairness_weight: f64,

    /// Seconds added per transfer (default: 300)
    #[serde(default = "default_transfer_penalty_secs")]
    pub transfer_penalty_secs: f64,

    /// Seconds subtracted for a major hub (default: 300)
    #[serde(default = "default_major_hub_bonus_secs")]
    pub major_hub_bonus_secs: f64,

    /// Ring candidates generated when no hub is relevant (default: 6)
    #[serde(default = "default_ring_candidate_count")]
    pub ring_candidate_count: usize,

    /// Ring radius as a fraction of the party distance (default: 0.25)
    #[serde(default = "default_ring_radius_fraction")]
    pub ring_radius_fraction: f64,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Departure offset from now when none is given (default: 5)
    #[serde(default = "default_departure_offset_minutes")]
    pub departure_offset_minutes: i64,
}

const fn default_max_hub_candidates() -> usize {
    DEFAULT_MAX_HUB_CANDIDATES
}

const fn default_fairness_weight() -> f64 {
    DEFAULT_FAIRNESS_WEIGHT
}

const fn default_transfer_penalty_secs() -> f64 {
    DEFAULT_TRANSFER_PENALTY_SECS
}

const fn default_major_hub_bonus_secs() -> f64 {
    DEFAULT_MAJOR_HUB_BONUS_SECS
}

const fn default_ring_candidate_count() -> usize {
    DEFAULT_RING_CANDIDATE_COUNT
}

const fn default_ring_radius_fraction() -> f64 {
    DEFAULT_RING_RADIUS_FRACTION
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_departure_offset_minutes() -> i64 {
    DEFAULT_DEPARTURE_OFFSET_MINUTES
}

impl Default for EngineAppConfig {
    fn default() -> Self {
        Self {
            max_hub_candidates: default_max_hub_candidates(),
            fairness_weight: default_fairness_weight(),
            transfer_penalty_secs: default_transfer_penalty_secs(),
            major_hub_bonus_secs: default_major_hub_bonus_secs(),
            ring_candidate_count: default_ring_candidate_count(),
            ring_radius_fraction: default_ring_radius_fraction(),
            request_timeout_secs: default_request_timeout_secs(),
            departure_offset_minutes: default_departure_offset_minutes(),
        }
    }
}

impl EngineAppConfig {
    /// Convert into validated engine settings
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Configuration` for out-of-range values.
    pub fn to_settings(&self) -> Result<EngineSettings, ApplicationError> {
        let weights = ScoringWeights::new(
            self.fairness_weight,
            self.transfer_penalty_secs,
            self.major_hub_bonus_secs,
        )?;

        if !self.ring_radius_fraction.is_finite() || self.ring_radius_fraction <= 0.0 {
            return Err(ApplicationError::Configuration(format!(
                "engine.ring_radius_fraction must be positive, got {}",
                self.ring_radius_fraction
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ApplicationError::Configuration(
                "engine.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.departure_offset_minutes < 0 {
            return Err(ApplicationError::Configuration(format!(
                "engine.departure_offset_minutes must not be negative, got {}",
                self.departure_offset_minutes
            )));
        }

        Ok(EngineSettings {
            max_hub_candidates: self.max_hub_candidates,
            ring_candidate_count: self.ring_candidate_count,
            ring_radius_fraction: self.ring_radius_fraction,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            departure_offset_minutes: self.departure_offset_minutes,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_convert() {
        let settings = EngineAppConfig::default().to_settings().unwrap();
        assert_eq!(settings.max_hub_candidates, 5);
        assert_eq!(settings.ring_candidate_count, 6);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert!((settings.weights.fairness_weight() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn fairness_weight_out_of_range_rejected() {
        let config = EngineAppConfig {
            fairness_weight: 3.5,
            ..EngineAppConfig::default()
        };
        assert!(matches!(
            config.to_settings(),
            Err(ApplicationError::Configuration(_))
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = EngineAppConfig {
            request_timeout_secs: 0,
            ..EngineAppConfig::default()
        };
        assert!(config.to_settings().is_err());
    }

    #[test]
    fn non_positive_ring_fraction_rejected() {
        let config = EngineAppConfig {
            ring_radius_fraction: 0.0,
            ..EngineAppConfig::default()
        };
        assert!(config.to_settings().is_err());
    }
}
