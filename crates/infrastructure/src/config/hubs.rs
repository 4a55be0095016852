//! Extra hub catalog entries.

use domain::{Coordinate, Hub, ImportanceTier};
use serde::{Deserialize, Serialize};

/// A hub added to the built-in catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubAppConfig {
    /// Station name
    pub name: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Importance tier (default: local)
    #[serde(default = "default_tier")]
    pub tier: ImportanceTier,
}

const fn default_tier() -> ImportanceTier {
    ImportanceTier::Local
}

impl HubAppConfig {
    /// Convert into a catalog hub
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the coordinates are invalid.
    pub fn to_hub(&self) -> Result<Hub, String> {
        if self.name.trim().is_empty() {
            return Err("hub name must not be empty".to_string());
        }
        let coordinate = Coordinate::new(self.latitude, self.longitude)
            .map_err(|e| format!("hub '{}': {e}", self.name))?;
        Ok(Hub::new(self.name.clone(), coordinate, self.tier))
    }
}
