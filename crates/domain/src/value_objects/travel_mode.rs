//! Travel mode value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a party prefers to travel to the meeting point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    /// Public transit (default)
    #[default]
    Transit,
    /// On foot
    Walking,
    /// By bicycle
    Bicycling,
    /// By car
    Driving,
}

impl TravelMode {
    /// Wire name shared by the routing providers
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transit => "transit",
            Self::Walking => "walking",
            Self::Bicycling => "bicycling",
            Self::Driving => "driving",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transit" => Ok(Self::Transit),
            "walking" | "walk" => Ok(Self::Walking),
            "bicycling" | "bike" | "cycling" => Ok(Self::Bicycling),
            "driving" | "car" => Ok(Self::Driving),
            other => Err(format!("Invalid travel mode: {other}")),
        }
    }
}
