//! Routing error types

use thiserror::Error;

/// Errors that can occur while talking to a routing provider
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP request was rejected or answered with an unexpected status
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body did not match the provider's wire format
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Provider asked us to slow down (HTTP 429 or a quota status)
    #[error("Rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimitExceeded {
        /// `Retry-After` value, when the provider sent one
        retry_after_secs: Option<u64>,
    },

    /// Credential missing, invalid or revoked
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Provider answered but knows no itinerary between the two points
    #[error("No routes found from {from} to {to}")]
    NoRoutesFound { from: String, to: String },

    /// Provider cannot route with the requested travel mode
    #[error("Unsupported travel mode: {0}")]
    UnsupportedMode(String),

    /// Provider-side outage (HTTP 5xx or an explicit error status)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Client cannot be built from its configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },
}

/// How the caller should treat a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Outage, timeout or rejected request; the next call may succeed
    Transient,
    /// Provider is throttling this client
    Throttled,
    /// The credential or client setup is broken; further calls are pointless
    Credential,
    /// No itinerary for these inputs
    NoItinerary,
    /// Payload could not be understood
    Malformed,
}

impl RoutingError {
    /// Classify the failure
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::ConnectionFailed(_)
            | Self::RequestFailed(_)
            | Self::ServiceUnavailable(_)
            | Self::Timeout { .. } => FailureClass::Transient,
            Self::RateLimitExceeded { .. } => FailureClass::Throttled,
            Self::AuthenticationFailed(_) | Self::ConfigurationError(_) => {
                FailureClass::Credential
            },
            Self::NoRoutesFound { .. } | Self::UnsupportedMode(_) => FailureClass::NoItinerary,
            Self::ParseError(_) => FailureClass::Malformed,
        }
    }

    /// Delay requested by a throttling provider
    #[must_use]
    pub const fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimitExceeded { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }

    /// Returns true if the provider answered but had no itinerary
    #[must_use]
    pub const fn is_no_route(&self) -> bool {
        matches!(self.class(), FailureClass::NoItinerary)
    }
}
