//! Value Objects - Immutable, identity-less domain primitives

mod billing_period;
mod coordinate;
mod importance_tier;
mod provider_id;
mod travel_mode;

pub use billing_period::BillingPeriod;
pub use coordinate::{Coordinate, EARTH_RADIUS_METERS, InvalidCoordinates};
pub use importance_tier::ImportanceTier;
pub use provider_id::ProviderId;
pub use travel_mode::TravelMode;
