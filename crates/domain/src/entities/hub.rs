//! Named transit hub entity

use serde::{Deserialize, Serialize};

use super::Candidate;
use crate::value_objects::{Coordinate, ImportanceTier};

/// A known high-connectivity location prioritised as a meeting point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    /// Display name (e.g. "Penn Station")
    pub name: String,
    /// Location of the hub
    pub coordinate: Coordinate,
    /// How well connected the hub is
    pub tier: ImportanceTier,
}

impl Hub {
    /// Create a hub
    #[must_use]
    pub fn new(name: impl Into<String>, coordinate: Coordinate, tier: ImportanceTier) -> Self {
        Self {
            name: name.into(),
            coordinate,
            tier,
        }
    }

    /// Turn this hub into a resolution candidate
    #[must_use]
    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(self.coordinate, self.name.clone(), self.tier)
    }
}
