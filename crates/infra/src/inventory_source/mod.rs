//! Inventory Snapshot Source: the product collection and its change feed.
//!
//! Two seams over the same store:
//! - [`InventorySource`] is everything the reconciliation engine may do: read the
//!   full snapshot, subscribe to snapshot notifications, and write status corrections.
//!   Engine-issued status writes go through `apply_correction` and nowhere else.
//! - [`InventoryCatalog`] is the surface for the other writers (order fulfillment,
//!   admin edits). They change stock and may toggle status manually.
//!
//! Every successful mutation publishes the full post-write snapshot.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use thiserror::Error;

use electra_core::{DomainError, ProductId};
use electra_events::{Notification, Subscription};
use electra_inventory::{InventorySnapshot, ProductRecord, ProductStatus, StatusCorrection};

pub use in_memory::InMemoryInventorySource;
pub use postgres::PostgresInventorySource;

/// Collection name used as the notification source.
pub const PRODUCTS_COLLECTION: &str = "products";

pub type SnapshotNotification = Notification<InventorySnapshot>;

#[derive(Debug, Error)]
pub enum InventorySourceError {
    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for InventorySourceError {
    fn from(value: sqlx::Error) -> Self {
        InventorySourceError::Storage(value.to_string())
    }
}

/// Read side + correction path used by the reconciliation engine.
pub trait InventorySource: Send + Sync {
    /// Full current set of product records.
    fn read_snapshot(&self) -> Result<InventorySnapshot, InventorySourceError>;

    /// Write back a status decided by a reconciliation pass.
    ///
    /// Last write wins: stock may have moved since the snapshot the correction was
    /// decided on, and this does not check.
    fn apply_correction(&self, correction: &StatusCorrection) -> Result<(), InventorySourceError>;

    /// Snapshot notifications for every change after this call.
    fn subscribe(&self) -> Subscription<SnapshotNotification>;
}

/// Write surface for order fulfillment and admin edits.
pub trait InventoryCatalog: Send + Sync {
    fn get_product(&self, id: &ProductId) -> Result<Option<ProductRecord>, InventorySourceError>;

    /// Insert or replace a product record.
    fn upsert_product(&self, record: ProductRecord) -> Result<ProductRecord, InventorySourceError>;

    /// Add `delta` to the product's stock. Fails without writing if the result would be negative.
    fn adjust_stock(&self, id: &ProductId, delta: i64) -> Result<ProductRecord, InventorySourceError>;

    /// Manual activation/deactivation.
    fn set_status(&self, id: &ProductId, status: ProductStatus) -> Result<ProductRecord, InventorySourceError>;
}

/// Both seams behind one object, for wiring a single store into an application.
pub trait InventoryStore: InventorySource + InventoryCatalog {}

impl<T> InventoryStore for T where T: InventorySource + InventoryCatalog + ?Sized {}

impl<S> InventorySource for Arc<S>
where
    S: InventorySource + ?Sized,
{
    fn read_snapshot(&self) -> Result<InventorySnapshot, InventorySourceError> {
        (**self).read_snapshot()
    }

    fn apply_correction(&self, correction: &StatusCorrection) -> Result<(), InventorySourceError> {
        (**self).apply_correction(correction)
    }

    fn subscribe(&self) -> Subscription<SnapshotNotification> {
        (**self).subscribe()
    }
}

impl<S> InventoryCatalog for Arc<S>
where
    S: InventoryCatalog + ?Sized,
{
    fn get_product(&self, id: &ProductId) -> Result<Option<ProductRecord>, InventorySourceError> {
        (**self).get_product(id)
    }

    fn upsert_product(&self, record: ProductRecord) -> Result<ProductRecord, InventorySourceError> {
        (**self).upsert_product(record)
    }

    fn adjust_stock(&self, id: &ProductId, delta: i64) -> Result<ProductRecord, InventorySourceError> {
        (**self).adjust_stock(id, delta)
    }

    fn set_status(&self, id: &ProductId, status: ProductStatus) -> Result<ProductRecord, InventorySourceError> {
        (**self).set_status(id, status)
    }
}
