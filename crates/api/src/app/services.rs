use std::{
    convert::Infallible,
    sync::Arc,
    time::Duration,
};

use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use electra_infra::{
    AlertLog, ElectraConfig, InMemoryAlertLog, InMemoryInventorySource, InventoryStore,
    PostgresAlertLog, PostgresInventorySource, ReconciliationWorker, StockReconciler,
    WorkerHandle, db,
};

use crate::app::errors;

/// Realtime message broadcasted via SSE.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

pub type SharedInventory = Arc<dyn InventoryStore>;
pub type SharedAlerts = Arc<dyn AlertLog>;
pub type SharedReconciler = StockReconciler<SharedInventory, SharedAlerts>;

/// Everything the handlers need. Stores are type-erased so the in-memory and
/// Postgres wirings share one router.
pub struct AppServices {
    inventory: SharedInventory,
    alerts: SharedAlerts,
    reconciler: Arc<SharedReconciler>,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
    delivery_fee: u64,
    // Held for the lifetime of the app.
    _worker: WorkerHandle,
}

impl AppServices {
    pub fn inventory(&self) -> SharedInventory {
        self.inventory.clone()
    }

    pub fn alerts(&self) -> SharedAlerts {
        self.alerts.clone()
    }

    pub fn reconciler(&self) -> Arc<SharedReconciler> {
        self.reconciler.clone()
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    pub fn delivery_fee(&self) -> u64 {
        self.delivery_fee
    }
}

/// Wire stores (Postgres when `DATABASE_URL` is set, in-memory otherwise),
/// start the reconciliation worker and the realtime alert feed.
pub async fn build_services(config: &ElectraConfig) -> anyhow::Result<AppServices> {
    let (inventory, alerts): (SharedInventory, SharedAlerts) = match &config.database_url {
        Some(url) => {
            let pool = db::connect(url).await?;
            let handle = Handle::current();
            tracing::info!("using postgres stores");
            let source = Arc::new(PostgresInventorySource::new(pool.clone(), handle.clone()));
            // Without the listener only this process's writes are seen.
            if let Err(e) = source.spawn_change_listener().await {
                tracing::warn!(error = %e, "product change listener unavailable");
            }
            (source as SharedInventory, Arc::new(PostgresAlertLog::new(pool, handle)))
        }
        None => {
            tracing::info!("using in-memory stores");
            (
                Arc::new(InMemoryInventorySource::new()),
                Arc::new(InMemoryAlertLog::new()),
            )
        }
    };

    let reconciler = Arc::new(StockReconciler::new(
        inventory.clone(),
        alerts.clone(),
        config.thresholds,
    ));

    // Realtime channel (SSE): lossy broadcast.
    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    // Background bridge: alert log feed -> realtime channel.
    {
        let sub = alerts.subscribe();
        let realtime_tx = realtime_tx.clone();
        tokio::task::spawn_blocking(move || {
            while let Ok(alert) = sub.recv() {
                // Lossy; no subscribers is fine.
                let _ = realtime_tx.send(RealtimeMessage {
                    topic: "stock_alert.created".to_string(),
                    payload: serde_json::to_value(&alert).unwrap_or_default(),
                });
            }
        });
    }

    let worker = ReconciliationWorker::spawn("inventory.reconcile", reconciler.clone())?;

    Ok(AppServices {
        inventory,
        alerts,
        reconciler,
        realtime_tx,
        delivery_fee: config.delivery_fee,
        _worker: worker,
    })
}

/// Run a store call off the async executor (the Postgres adapters block).
pub async fn blocking<T, F>(f: F) -> Result<T, axum::response::Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string())
    })
}

pub fn alert_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(m) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        // Lagged receivers skip what they missed.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
