use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use electra_events::Subscription;

use crate::alert_log::AlertLog;
use crate::inventory_source::{InventorySource, SnapshotNotification};
use crate::reconciler::StockReconciler;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    passes: Arc<AtomicU64>,
}

impl WorkerHandle {
    /// Passes completed so far (startup pass included).
    pub fn passes_completed(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    /// Whether the worker thread has exited (shutdown or a disconnected feed).
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }

    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Change-triggered reconciliation loop.
///
/// - Subscribes to the source's snapshot notifications before the thread starts,
///   so no change made after `spawn` returns is missed
/// - Runs one startup pass over the current snapshot
/// - Then one pass per notification, each on the snapshot it carries
/// - Stops on shutdown, when the handle is dropped, or when the notification
///   stream disconnects (no resubscribe)
#[derive(Debug)]
pub struct ReconciliationWorker;

impl ReconciliationWorker {
    pub fn spawn<S, L>(
        name: &'static str,
        reconciler: Arc<StockReconciler<S, L>>,
    ) -> std::io::Result<WorkerHandle>
    where
        S: InventorySource + 'static,
        L: AlertLog + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = reconciler.source().subscribe();
        let passes = Arc::new(AtomicU64::new(0));

        let counter = passes.clone();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &reconciler, &counter))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            passes,
        })
    }
}

fn worker_loop<S, L>(
    name: &'static str,
    sub: Subscription<SnapshotNotification>,
    shutdown_rx: mpsc::Receiver<()>,
    reconciler: &StockReconciler<S, L>,
    passes: &AtomicU64,
) where
    S: InventorySource,
    L: AlertLog,
{
    info!(worker = name, "reconciliation worker started");

    match reconciler.reconcile_current() {
        Ok(report) => {
            passes.fetch_add(1, Ordering::SeqCst);
            info!(
                worker = name,
                products = report.products_seen,
                alerts = report.alerts_raised.len(),
                failures = report.failures.len(),
                "startup reconciliation pass done"
            );
        }
        Err(e) => warn!(worker = name, error = %e, "startup snapshot read failed"),
    }

    let tick = Duration::from_millis(250);

    loop {
        // Shutdown check (non-blocking); a dropped handle also stops the worker.
        match shutdown_rx.try_recv() {
            Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        match sub.recv_timeout(tick) {
            Ok(notification) => {
                let sequence = notification.sequence();
                let snapshot = notification.into_payload();
                let report = reconciler.reconcile(&snapshot);
                passes.fetch_add(1, Ordering::SeqCst);

                if !report.is_clean() {
                    warn!(
                        worker = name,
                        sequence,
                        failures = report.failures.len(),
                        "reconciliation pass finished with failures"
                    );
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!(worker = name, "snapshot subscription disconnected");
                break;
            }
        }
    }

    info!(worker = name, "reconciliation worker stopped");
}
