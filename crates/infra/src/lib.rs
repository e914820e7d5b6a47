//! Infrastructure layer: stores, the reconciliation engine, workers, config.

pub mod alert_log;
pub mod config;
pub mod db;
pub mod fulfillment;
pub mod inventory_source;
pub mod reconciler;
pub mod workers;

mod integration_tests;

pub use alert_log::{AlertLog, AlertLogError, InMemoryAlertLog, PostgresAlertLog, unread_alerts};
pub use config::{ConfigError, ElectraConfig};
pub use fulfillment::{FulfillmentReport, LineOutcome, fulfill_order};
pub use inventory_source::{
    InMemoryInventorySource, InventoryCatalog, InventorySource, InventorySourceError,
    InventoryStore, PostgresInventorySource,
};
pub use reconciler::{ReconcileFailure, ReconcileOperation, ReconcileReport, StockReconciler};
pub use workers::{ReconciliationWorker, WorkerHandle};
