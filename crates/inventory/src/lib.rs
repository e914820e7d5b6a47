//! Inventory domain module.
//!
//! This crate contains the business rules for stock levels and stock alerts,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod alert;
pub mod product;
pub mod reconcile;

pub use alert::{AlertType, NewStockAlert, StockAlert};
pub use product::{InventorySnapshot, ProductRecord, ProductStatus};
pub use reconcile::{
    DEFAULT_LOW_STOCK_THRESHOLD, ProductPlan, StatusCorrection, StockDecision, StockThresholds,
    decide, plan_pass,
};
