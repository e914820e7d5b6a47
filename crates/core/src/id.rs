//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a product in the inventory.
///
/// Product ids are opaque strings owned by the document store (they are not
/// guaranteed to be UUIDs), so the only rule enforced here is "non-blank".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Generate a fresh id for a newly created product.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("ProductId: empty"));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for ProductId {
    /// Infallible conversion for fixtures and trusted store data.
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of a stock alert record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered), so alert ids sort by creation time.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for AlertId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for AlertId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for AlertId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("AlertId: {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_rejects_blank() {
        assert!("   ".parse::<ProductId>().is_err());
        assert_eq!("p1".parse::<ProductId>().unwrap().as_str(), "p1");
    }

    #[test]
    fn product_id_trims_whitespace() {
        let id: ProductId = "  meter-3ph ".parse().unwrap();
        assert_eq!(id.to_string(), "meter-3ph");
    }

    #[test]
    fn alert_id_round_trips_through_display() {
        let id = AlertId::new();
        let parsed: AlertId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn alert_id_rejects_garbage() {
        assert!(matches!(
            "not-a-uuid".parse::<AlertId>(),
            Err(DomainError::InvalidId(_))
        ));
    }
}
