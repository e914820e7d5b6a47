use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use electra_core::{DomainError, DomainResult, Entity, ProductId};

/// Product availability in the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
        }
    }
}

impl core::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            other => Err(DomainError::validation(format!(
                "status must be one of: active, inactive (got {other:?})"
            ))),
        }
    }
}

/// One product as seen by the inventory store.
///
/// Invariants enforced on every write path:
/// - `name` is non-empty
/// - `stock >= 0`
///
/// `status == Inactive` whenever `stock == 0` is *eventually* true: the reconciliation
/// engine restores it after each change, it is not checked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub stock: i64,
    pub status: ProductStatus,
}

impl ProductRecord {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        stock: i64,
        status: ProductStatus,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        Ok(Self {
            id,
            name,
            stock,
            status,
        })
    }

    /// Stock level after applying `delta`, without mutating.
    pub fn adjusted_stock(&self, delta: i64) -> DomainResult<i64> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_stock = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("stock overflow"))?;
        if new_stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        Ok(new_stock)
    }

    /// Apply a stock delta in place.
    pub fn adjust_stock(&mut self, delta: i64) -> DomainResult<()> {
        self.stock = self.adjusted_stock(delta)?;
        Ok(())
    }

    pub fn is_depleted(&self) -> bool {
        self.stock == 0
    }

    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

impl Entity for ProductRecord {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Full current set of product records, as delivered on every change.
///
/// This is never a diff: a consumer only needs the latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub products: Vec<ProductRecord>,
    pub taken_at: DateTime<Utc>,
}

impl InventorySnapshot {
    pub fn new(products: Vec<ProductRecord>, taken_at: DateTime<Utc>) -> Self {
        Self { products, taken_at }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.products.iter()
    }

    pub fn get(&self, id: &ProductId) -> Option<&ProductRecord> {
        self.products.iter().find(|p| &p.id == id)
    }
}
