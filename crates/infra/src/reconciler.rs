//! Reconciliation engine: one pass per inventory snapshot.
//!
//! ```text
//! snapshot -> decide (pure, per product) -> append alert -> apply status correction
//! ```
//!
//! Each product is read, decided and written on its own. A failed write is logged
//! and recorded in the pass report; it never stops the remaining products. There
//! is no retry and no transaction across products or across the two writes of one
//! product.

use serde::Serialize;
use tracing::{debug, info_span, warn};

use electra_core::ProductId;
use electra_inventory::{
    InventorySnapshot, ProductPlan, StatusCorrection, StockAlert, StockThresholds, plan_pass,
};

use crate::alert_log::AlertLog;
use crate::inventory_source::{InventorySource, InventorySourceError};

/// Which write of a product's pipeline failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOperation {
    AppendAlert,
    ApplyCorrection,
}

impl ReconcileOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileOperation::AppendAlert => "append_alert",
            ReconcileOperation::ApplyCorrection => "apply_correction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileFailure {
    pub product_id: ProductId,
    pub operation: ReconcileOperation,
    pub error: String,
}

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub products_seen: usize,
    pub alerts_raised: Vec<StockAlert>,
    pub status_corrections: Vec<StatusCorrection>,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the stock decision rule over snapshots and writes the resulting effects.
///
/// Holds no state between passes.
#[derive(Debug, Clone)]
pub struct StockReconciler<S, L> {
    source: S,
    alerts: L,
    thresholds: StockThresholds,
}

impl<S, L> StockReconciler<S, L>
where
    S: InventorySource,
    L: AlertLog,
{
    pub fn new(source: S, alerts: L, thresholds: StockThresholds) -> Self {
        Self {
            source,
            alerts,
            thresholds,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn alerts(&self) -> &L {
        &self.alerts
    }

    /// One reconciliation pass over `snapshot`.
    pub fn reconcile(&self, snapshot: &InventorySnapshot) -> ReconcileReport {
        let span = info_span!("reconcile", products = snapshot.len());
        let _guard = span.enter();

        let mut report = ReconcileReport {
            products_seen: snapshot.len(),
            ..ReconcileReport::default()
        };

        for product in snapshot.iter() {
            if product.stock < 0 {
                warn!(product_id = %product.id, stock = product.stock, "negative stock in snapshot");
            }
        }

        for plan in plan_pass(snapshot, &self.thresholds) {
            self.execute(plan, &mut report);
        }

        debug!(
            alerts = report.alerts_raised.len(),
            corrections = report.status_corrections.len(),
            failures = report.failures.len(),
            "reconciliation pass complete"
        );
        report
    }

    /// Read the current snapshot and reconcile it (startup pass).
    pub fn reconcile_current(&self) -> Result<ReconcileReport, InventorySourceError> {
        let snapshot = self.source.read_snapshot()?;
        Ok(self.reconcile(&snapshot))
    }

    fn execute(&self, plan: ProductPlan, report: &mut ReconcileReport) {
        let ProductPlan {
            product_id,
            alert,
            correction,
            ..
        } = plan;

        if let Some(alert) = alert {
            match self.alerts.append(alert) {
                Ok(stored) => report.alerts_raised.push(stored),
                Err(e) => {
                    warn!(
                        product_id = %product_id,
                        operation = ReconcileOperation::AppendAlert.as_str(),
                        error = %e,
                        "stock alert append failed"
                    );
                    report.failures.push(ReconcileFailure {
                        product_id: product_id.clone(),
                        operation: ReconcileOperation::AppendAlert,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(correction) = correction {
            match self.source.apply_correction(&correction) {
                Ok(()) => report.status_corrections.push(correction),
                Err(e) => {
                    warn!(
                        product_id = %product_id,
                        operation = ReconcileOperation::ApplyCorrection.as_str(),
                        to = %correction.to,
                        error = %e,
                        "status correction failed"
                    );
                    report.failures.push(ReconcileFailure {
                        product_id,
                        operation: ReconcileOperation::ApplyCorrection,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}
