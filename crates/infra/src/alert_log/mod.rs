//! Alert Log: append-only store of stock alerts.
//!
//! The reconciliation engine only appends. Reading unread alerts and marking
//! them read belong to the admin consumer.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use electra_core::AlertId;
use electra_events::Subscription;
use electra_inventory::{NewStockAlert, StockAlert};

pub use in_memory::InMemoryAlertLog;
pub use postgres::PostgresAlertLog;

#[derive(Debug, Error)]
pub enum AlertLogError {
    #[error("alert not found: {0}")]
    NotFound(AlertId),

    #[error("invalid alert record: {0}")]
    Corrupt(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for AlertLogError {
    fn from(value: sqlx::Error) -> Self {
        AlertLogError::Storage(value.to_string())
    }
}

pub trait AlertLog: Send + Sync {
    /// Append a new, unread alert. The log assigns id and creation time.
    fn append(&self, alert: NewStockAlert) -> Result<StockAlert, AlertLogError>;

    /// All alerts with `is_read == false`, newest first.
    fn unread(&self) -> Result<Vec<StockAlert>, AlertLogError>;

    /// Flip `is_read` to true. Marking an already-read alert is a no-op.
    fn mark_read(&self, id: AlertId) -> Result<StockAlert, AlertLogError>;

    /// Most recent alerts regardless of read state, newest first.
    fn list_recent(&self, limit: usize) -> Result<Vec<StockAlert>, AlertLogError>;

    /// Live feed of alerts appended after this call.
    fn subscribe(&self) -> Subscription<StockAlert>;
}

impl<L> AlertLog for Arc<L>
where
    L: AlertLog + ?Sized,
{
    fn append(&self, alert: NewStockAlert) -> Result<StockAlert, AlertLogError> {
        (**self).append(alert)
    }

    fn unread(&self) -> Result<Vec<StockAlert>, AlertLogError> {
        (**self).unread()
    }

    fn mark_read(&self, id: AlertId) -> Result<StockAlert, AlertLogError> {
        (**self).mark_read(id)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<StockAlert>, AlertLogError> {
        (**self).list_recent(limit)
    }

    fn subscribe(&self) -> Subscription<StockAlert> {
        (**self).subscribe()
    }
}

/// Unread alerts for the admin view.
///
/// A failed read yields an empty list (logged): the admin page stays up.
pub fn unread_alerts<L>(log: &L) -> Vec<StockAlert>
where
    L: AlertLog + ?Sized,
{
    match log.unread() {
        Ok(alerts) => alerts,
        Err(e) => {
            warn!(operation = "unread_alerts", error = %e, "unread alert query failed");
            Vec::new()
        }
    }
}
