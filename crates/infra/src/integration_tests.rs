//! Integration tests for the reconciliation pipeline.
//!
//! Tests: Snapshot Source → Reconciliation Engine → Alert Log / status corrections
//!
//! Verifies:
//! - The per-product decision rule end to end (scenarios A–E)
//! - Alerts are not deduplicated across passes
//! - One failing write does not stop the rest of a pass
//! - The worker reacts to change notifications

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, mpsc};
    use std::time::{Duration, Instant};

    use electra_core::{AlertId, ProductId};
    use electra_events::{EventBus, InMemoryEventBus, Notification, Subscription};
    use electra_inventory::{
        AlertType, InventorySnapshot, NewStockAlert, ProductRecord, ProductStatus,
        StatusCorrection, StockAlert, StockThresholds,
    };

    use crate::alert_log::{AlertLog, AlertLogError, InMemoryAlertLog, unread_alerts};
    use crate::inventory_source::{
        InMemoryInventorySource, InventoryCatalog, InventorySource, InventorySourceError,
        SnapshotNotification,
    };
    use crate::reconciler::{ReconcileOperation, StockReconciler};
    use crate::workers::ReconciliationWorker;

    fn product(id: &str, stock: i64, status: ProductStatus) -> ProductRecord {
        ProductRecord::new(ProductId::from(id), format!("Product {id}"), stock, status).unwrap()
    }

    fn setup(
        products: Vec<ProductRecord>,
    ) -> StockReconciler<Arc<InMemoryInventorySource>, Arc<InMemoryAlertLog>> {
        StockReconciler::new(
            Arc::new(InMemoryInventorySource::with_products(products)),
            Arc::new(InMemoryAlertLog::new()),
            StockThresholds::default(),
        )
    }

    fn status_of(r: &StockReconciler<Arc<InMemoryInventorySource>, Arc<InMemoryAlertLog>>, id: &str) -> ProductStatus {
        r.source()
            .get_product(&ProductId::from(id))
            .unwrap()
            .unwrap()
            .status
    }

    #[test]
    fn scenario_a_depleted_product_alerts_and_deactivates() {
        let r = setup(vec![product("p1", 0, ProductStatus::Active)]);

        let report = r.reconcile_current().unwrap();

        assert_eq!(report.alerts_raised.len(), 1);
        let alert = &report.alerts_raised[0];
        assert_eq!(alert.product_id.as_str(), "p1");
        assert_eq!(alert.alert_type, AlertType::OutOfStock);
        assert_eq!(alert.current_stock, 0);
        assert!(!alert.is_read);
        assert_eq!(status_of(&r, "p1"), ProductStatus::Inactive);
    }

    #[test]
    fn scenario_b_low_stock_alerts_without_status_change() {
        let r = setup(vec![product("p2", 3, ProductStatus::Active)]);

        let report = r.reconcile_current().unwrap();

        assert_eq!(report.alerts_raised.len(), 1);
        assert_eq!(report.alerts_raised[0].alert_type, AlertType::LowStock);
        assert_eq!(report.alerts_raised[0].current_stock, 3);
        assert!(report.status_corrections.is_empty());
        assert_eq!(status_of(&r, "p2"), ProductStatus::Active);
    }

    #[test]
    fn scenario_c_replenished_product_is_reactivated() {
        let r = setup(vec![product("p3", 10, ProductStatus::Inactive)]);

        let report = r.reconcile_current().unwrap();

        assert!(report.alerts_raised.is_empty());
        assert_eq!(report.status_corrections.len(), 1);
        assert_eq!(status_of(&r, "p3"), ProductStatus::Active);
        assert!(r.alerts().is_empty());
    }

    #[test]
    fn scenario_d_healthy_product_is_untouched() {
        let r = setup(vec![product("p4", 50, ProductStatus::Active)]);
        let sub = r.source().subscribe();

        let report = r.reconcile_current().unwrap();

        assert!(report.alerts_raised.is_empty());
        assert!(report.status_corrections.is_empty());
        // No write means no change notification either.
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn scenario_e_unread_query_reflects_mark_read() {
        let r = setup(vec![
            product("p1", 0, ProductStatus::Active),
            product("p2", 3, ProductStatus::Active),
        ]);
        r.reconcile_current().unwrap();

        let unread = unread_alerts(r.alerts());
        assert_eq!(unread.len(), 2);
        assert!(unread.iter().all(|a| !a.is_read));

        let p1_alert = unread.iter().find(|a| a.product_id.as_str() == "p1").unwrap();
        r.alerts().mark_read(p1_alert.id).unwrap();

        let unread = unread_alerts(r.alerts());
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].product_id.as_str(), "p2");
    }

    #[test]
    fn repeated_passes_duplicate_alerts() {
        // Known behaviour: no deduplication across passes.
        let snapshot = InventorySnapshot::new(
            vec![product("p1", 0, ProductStatus::Inactive)],
            chrono::Utc::now(),
        );
        let r = setup(snapshot.products.clone());

        r.reconcile(&snapshot);
        r.reconcile(&snapshot);

        let alerts = r.alerts().all();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.alert_type == AlertType::OutOfStock));
        assert_ne!(alerts[0].id, alerts[1].id);
    }

    #[test]
    fn mixed_snapshot_processes_every_product_once() {
        let r = setup(vec![
            product("a", 0, ProductStatus::Active),
            product("b", 3, ProductStatus::Active),
            product("c", 10, ProductStatus::Inactive),
            product("d", 50, ProductStatus::Active),
        ]);

        let report = r.reconcile_current().unwrap();

        assert_eq!(report.products_seen, 4);
        assert_eq!(report.alerts_raised.len(), 2);
        assert_eq!(report.status_corrections.len(), 2);
        assert!(report.is_clean());
    }

    /// Alert log that rejects appends for one product, and optionally every unread query.
    struct FlakyAlertLog {
        inner: InMemoryAlertLog,
        fail_for: ProductId,
        fail_unread: bool,
    }

    impl AlertLog for FlakyAlertLog {
        fn append(&self, alert: NewStockAlert) -> Result<StockAlert, AlertLogError> {
            if alert.product_id == self.fail_for {
                return Err(AlertLogError::Storage("write rejected".to_string()));
            }
            self.inner.append(alert)
        }

        fn unread(&self) -> Result<Vec<StockAlert>, AlertLogError> {
            if self.fail_unread {
                return Err(AlertLogError::Storage("connection reset".to_string()));
            }
            self.inner.unread()
        }

        fn mark_read(&self, id: AlertId) -> Result<StockAlert, AlertLogError> {
            self.inner.mark_read(id)
        }

        fn list_recent(&self, limit: usize) -> Result<Vec<StockAlert>, AlertLogError> {
            self.inner.list_recent(limit)
        }

        fn subscribe(&self) -> Subscription<StockAlert> {
            self.inner.subscribe()
        }
    }

    #[test]
    fn failed_alert_append_does_not_stop_the_pass() {
        let source = Arc::new(InMemoryInventorySource::with_products(vec![
            product("a", 0, ProductStatus::Active),
            product("b", 0, ProductStatus::Active),
        ]));
        let log = Arc::new(FlakyAlertLog {
            inner: InMemoryAlertLog::new(),
            fail_for: ProductId::from("a"),
            fail_unread: false,
        });
        let r = StockReconciler::new(source.clone(), log.clone(), StockThresholds::default());

        let report = r.reconcile_current().unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].product_id.as_str(), "a");
        assert_eq!(report.failures[0].operation, ReconcileOperation::AppendAlert);
        // The status write for the same product still happens.
        assert_eq!(source.get_product(&ProductId::from("a")).unwrap().unwrap().status, ProductStatus::Inactive);
        // And the other product is fully processed.
        assert_eq!(log.inner.len(), 1);
        assert_eq!(source.get_product(&ProductId::from("b")).unwrap().unwrap().status, ProductStatus::Inactive);
    }

    #[test]
    fn unread_query_failure_yields_empty_list() {
        let mut log = FlakyAlertLog {
            inner: InMemoryAlertLog::new(),
            fail_for: ProductId::from("none"),
            fail_unread: false,
        };
        log.inner
            .append(NewStockAlert {
                product_id: ProductId::from("p1"),
                product_name: "Prepaid meter".to_string(),
                current_stock: 2,
                alert_type: AlertType::LowStock,
            })
            .unwrap();
        assert_eq!(unread_alerts(&log).len(), 1);

        log.fail_unread = true;
        assert!(log.unread().is_err());
        assert!(unread_alerts(&log).is_empty());
    }

    /// Source whose corrections always fail.
    struct ReadOnlySource {
        inner: InMemoryInventorySource,
        attempts: AtomicUsize,
    }

    impl InventorySource for ReadOnlySource {
        fn read_snapshot(&self) -> Result<InventorySnapshot, InventorySourceError> {
            self.inner.read_snapshot()
        }

        fn apply_correction(&self, _correction: &StatusCorrection) -> Result<(), InventorySourceError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(InventorySourceError::Storage("read-only replica".to_string()))
        }

        fn subscribe(&self) -> Subscription<SnapshotNotification> {
            self.inner.subscribe()
        }
    }

    #[test]
    fn failed_corrections_are_reported_not_retried() {
        let source = ReadOnlySource {
            inner: InMemoryInventorySource::with_products(vec![
                product("a", 0, ProductStatus::Active),
                product("b", 20, ProductStatus::Inactive),
            ]),
            attempts: AtomicUsize::new(0),
        };
        let r = StockReconciler::new(source, InMemoryAlertLog::new(), StockThresholds::default());

        let report = r.reconcile_current().unwrap();

        assert_eq!(r.source().attempts.load(Ordering::SeqCst), 2);
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| f.operation == ReconcileOperation::ApplyCorrection));
        // The alert for the depleted product was still recorded.
        assert_eq!(r.alerts().len(), 1);
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn worker_reconciles_on_change_notifications() {
        let source = Arc::new(InMemoryInventorySource::with_products(vec![product(
            "meter",
            8,
            ProductStatus::Active,
        )]));
        let log = Arc::new(InMemoryAlertLog::new());
        let reconciler = Arc::new(StockReconciler::new(
            source.clone(),
            log.clone(),
            StockThresholds::default(),
        ));

        let handle = ReconciliationWorker::spawn("test.reconcile", reconciler).unwrap();
        assert!(wait_until(|| handle.passes_completed() >= 1));
        assert!(log.is_empty());

        // Sell out: stock hits zero, worker deactivates and alerts.
        source.adjust_stock(&ProductId::from("meter"), -8).unwrap();
        assert!(wait_until(|| {
            source.get_product(&ProductId::from("meter")).unwrap().unwrap().status == ProductStatus::Inactive
        }));
        assert!(wait_until(|| log
            .all()
            .iter()
            .any(|a| a.alert_type == AlertType::OutOfStock)));

        // The deactivation is itself a change: one more pass, one more alert, then quiet.
        assert!(wait_until(|| log.len() >= 2));
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(log.len(), 2);
        assert!(log.all().iter().all(|a| a.alert_type == AlertType::OutOfStock));

        // Restock: worker reactivates.
        source.adjust_stock(&ProductId::from("meter"), 30).unwrap();
        assert!(wait_until(|| {
            source.get_product(&ProductId::from("meter")).unwrap().unwrap().status == ProductStatus::Active
        }));

        handle.shutdown();
    }

    /// Source that cannot be read but still has a live change feed.
    #[derive(Default)]
    struct UnreadableSource {
        bus: InMemoryEventBus<SnapshotNotification>,
    }

    impl InventorySource for UnreadableSource {
        fn read_snapshot(&self) -> Result<InventorySnapshot, InventorySourceError> {
            Err(InventorySourceError::Storage("connection refused".to_string()))
        }

        fn apply_correction(&self, _correction: &StatusCorrection) -> Result<(), InventorySourceError> {
            Ok(())
        }

        fn subscribe(&self) -> Subscription<SnapshotNotification> {
            self.bus.subscribe()
        }
    }

    #[test]
    fn failed_startup_read_produces_no_pass_and_no_alerts() {
        let source = Arc::new(UnreadableSource::default());
        let log = Arc::new(InMemoryAlertLog::new());
        let reconciler = Arc::new(StockReconciler::new(source.clone(), log.clone(), StockThresholds::default()));

        let handle = ReconciliationWorker::spawn("test.unreadable", reconciler).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(handle.passes_completed(), 0);
        assert!(log.is_empty());
        assert!(!handle.is_finished());

        // The worker keeps listening: a later notification is reconciled.
        let snapshot = InventorySnapshot::new(vec![product("p1", 0, ProductStatus::Active)], chrono::Utc::now());
        source
            .bus
            .publish(Notification::new(1, "products", snapshot.taken_at, snapshot))
            .unwrap();
        assert!(wait_until(|| handle.passes_completed() == 1));
        assert_eq!(log.len(), 1);

        handle.shutdown();
    }

    /// Source whose change feed is already disconnected.
    struct DeadFeedSource {
        inner: InMemoryInventorySource,
    }

    impl InventorySource for DeadFeedSource {
        fn read_snapshot(&self) -> Result<InventorySnapshot, InventorySourceError> {
            self.inner.read_snapshot()
        }

        fn apply_correction(&self, correction: &StatusCorrection) -> Result<(), InventorySourceError> {
            self.inner.apply_correction(correction)
        }

        fn subscribe(&self) -> Subscription<SnapshotNotification> {
            let (tx, rx) = mpsc::channel();
            drop(tx);
            Subscription::new(rx)
        }
    }

    #[test]
    fn disconnected_feed_ends_the_worker_without_resubscribing() {
        let source = DeadFeedSource {
            inner: InMemoryInventorySource::with_products(vec![product("p1", 3, ProductStatus::Active)]),
        };
        let log = Arc::new(InMemoryAlertLog::new());
        let reconciler = Arc::new(StockReconciler::new(source, log.clone(), StockThresholds::default()));

        let handle = ReconciliationWorker::spawn("test.dead_feed", reconciler).unwrap();
        assert!(wait_until(|| handle.is_finished()));
        // Only the startup pass ran.
        assert_eq!(handle.passes_completed(), 1);
        assert_eq!(log.len(), 1);

        let started = Instant::now();
        handle.shutdown();
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
