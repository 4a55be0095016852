//! Routing provider identifier value object

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::DomainError;

/// Stable identifier of an external routing provider (e.g. `"directions"`)
///
/// Used as the key for budget bookkeeping, so it must stay stable across
/// process restarts. Allowed characters: lowercase ASCII letters, digits,
/// `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a validated provider identifier
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidProviderId` if the id is empty, longer
    /// than 64 characters, or contains unsupported characters.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if id.is_empty() || id.len() > 64 || !valid_chars {
            return Err(DomainError::InvalidProviderId(id));
        }
        Ok(Self(id))
    }

    /// Borrow the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProviderId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProviderId> for String {
    fn from(id: ProviderId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ProviderId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_ids() {
        assert!(ProviderId::new("directions").is_ok());
        assert!(ProviderId::new("hafas-db_2").is_ok());
    }

    #[test]
    fn rejects_invalid_ids() {
        assert!(ProviderId::new("").is_err());
        assert!(ProviderId::new("Google").is_err());
        assert!(ProviderId::new("with space").is_err());
        assert!(ProviderId::new("x".repeat(65)).is_err());
    }

    #[test]
    fn serde_validates() {
        let id: ProviderId = serde_json::from_str("\"hafas\"").unwrap();
        assert_eq!(id.as_str(), "hafas");
        assert!(serde_json::from_str::<ProviderId>("\"HAFAS\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"hafas\"");
    }
}
