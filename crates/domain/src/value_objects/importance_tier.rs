//! Hub importance tier value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Importance of a meeting-point candidate
///
/// Ordering follows importance: `Generated < Local < Secondary < Major`, so
/// sorting descending puts major hubs first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceTier {
    /// Synthetic candidate produced by ring generation, not a named hub
    #[default]
    Generated,
    /// Neighbourhood station
    Local,
    /// Well-connected interchange
    Secondary,
    /// Major interchange (central station, multi-line hub)
    Major,
}

impl ImportanceTier {
    /// Lowercase name as used in configuration files
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Local => "local",
            Self::Secondary => "secondary",
            Self::Major => "major",
        }
    }

    /// Whether this candidate is a named hub from the catalog
    #[must_use]
    pub const fn is_hub(&self) -> bool {
        !matches!(self, Self::Generated)
    }
}

impl fmt::Display for ImportanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImportanceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "secondary" => Ok(Self::Secondary),
            "local" => Ok(Self::Local),
            "generated" => Ok(Self::Generated),
            other => Err(format!(
                "Invalid importance tier: {other}. Use 'major', 'secondary' or 'local'"
            )),
        }
    }
}
