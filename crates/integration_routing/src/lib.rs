//! Routing provider integration for Rendezvous
//!
//! Two providers are supported and both answer in the same canonical schema
//! ([`RouteResponse`]):
//!
//! - [`DirectionsClient`] for a Google-Directions-compatible API
//!   (all travel modes, key required)
//! - [`HafasClient`] for [transport.rest](https://v6.db.transport.rest)
//!   (transit and walking only)
//!
//! # Architecture
//!
//! The crate follows a client-trait pattern: [`RoutingClient`] defines the
//! interface, each provider parses its own wire format leniently and maps
//! provider failures onto [`RoutingError`]. Numeric fields are read leniently
//! and unusable values are replaced by the defaults from
//! [`domain::RouteMetrics::sanitized`].
//!
//! # Example
//!
//! ```rust,ignore
//! use domain::{Coordinate, TravelMode};
//! use integration_routing::{HafasClient, RouteQuery, RoutingClient, RoutingClientConfig};
//!
//! let client = HafasClient::new(&RoutingClientConfig::hafas())?;
//! let query = RouteQuery::new(
//!     Coordinate::new(52.521, 13.411)?,
//!     Coordinate::new(52.507, 13.333)?,
//!     TravelMode::Transit,
//! );
//! let response = client.route(&query).await?;
//! ```

mod client;
mod config;
mod directions;
mod error;
mod hafas;
mod models;
pub mod sanitize;

pub use client::{DEFAULT_DEPARTURE_OFFSET_MINUTES, RouteQuery, RoutingClient};
pub use config::{DEFAULT_DIRECTIONS_BASE_URL, DEFAULT_HAFAS_BASE_URL, RoutingClientConfig};
pub use directions::DirectionsClient;
pub use error::{FailureClass, RoutingError};
pub use hafas::HafasClient;
pub use models::{NormalizedRoute, RouteResponse, RouteStatus};
