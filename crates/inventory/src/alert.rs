use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use electra_core::{AlertId, Entity, ProductId};

/// Kind of threshold crossing recorded by an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    OutOfStock,
    LowStock,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::OutOfStock => "out_of_stock",
            AlertType::LowStock => "low_stock",
        }
    }
}

impl core::str::FromStr for AlertType {
    type Err = electra_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out_of_stock" => Ok(AlertType::OutOfStock),
            "low_stock" => Ok(AlertType::LowStock),
            other => Err(electra_core::DomainError::validation(format!(
                "unknown alert type {other:?}"
            ))),
        }
    }
}

/// An alert decided by a reconciliation pass, before the alert log assigns identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStockAlert {
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock: i64,
    pub alert_type: AlertType,
}

impl NewStockAlert {
    /// Materialize as a stored, unread alert record.
    pub fn into_alert(self, id: AlertId, created_at: DateTime<Utc>) -> StockAlert {
        StockAlert {
            id,
            product_id: self.product_id,
            product_name: self.product_name,
            current_stock: self.current_stock,
            alert_type: self.alert_type,
            created_at,
            is_read: false,
        }
    }
}

/// Append-only alert log entry.
///
/// Only `is_read` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: AlertId,
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock: i64,
    pub alert_type: AlertType,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

impl StockAlert {
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}

impl Entity for StockAlert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
