//! Domain-level errors

use thiserror::Error;

use crate::value_objects::InvalidCoordinates;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// Latitude/longitude outside the valid range or not finite
    #[error(transparent)]
    InvalidCoordinates(#[from] InvalidCoordinates),

    /// Provider identifier is empty or contains unsupported characters
    #[error("Invalid provider id: {0}")]
    InvalidProviderId(String),

    /// Billing period could not be parsed
    #[error("Invalid billing period: {0}")]
    InvalidBillingPeriod(String),

    /// Route metrics contain non-finite or negative values
    #[error("Invalid route metrics: {0}")]
    InvalidRouteMetrics(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}
