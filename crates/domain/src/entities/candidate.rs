//! Meeting-point candidate entity

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{Coordinate, ImportanceTier};

/// A coordinate being evaluated as a possible meeting point
///
/// Candidates are ephemeral: a fresh list is produced for every resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Where the parties would meet
    pub coordinate: Coordinate,
    /// Hub name, or a generated label for ring candidates
    pub label: String,
    /// Importance used for ordering and the scoring bonus
    pub tier: ImportanceTier,
}

impl Candidate {
    /// Create a candidate
    #[must_use]
    pub fn new(coordinate: Coordinate, label: impl Into<String>, tier: ImportanceTier) -> Self {
        Self {
            coordinate,
            label: label.into(),
            tier,
        }
    }

    /// Create a generated (non-hub) candidate
    #[must_use]
    pub fn generated(coordinate: Coordinate, label: impl Into<String>) -> Self {
        Self::new(coordinate, label, ImportanceTier::Generated)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] @ {}", self.label, self.tier, self.coordinate)
    }
}
