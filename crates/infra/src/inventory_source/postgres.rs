//! Postgres-backed inventory source.
//!
//! Maps to the `products` table (see `migrations/0001_init.sql`).
//!
//! ## Blocking contract
//!
//! The source traits are synchronous. Every method drives its query to completion
//! with `Handle::block_on`, so callers must be on a plain thread (the reconciliation
//! worker) or inside `tokio::task::spawn_blocking`, never directly on an async task.
//!
//! ## Change feed
//!
//! A trigger on `products` sends `NOTIFY` on [`PRODUCTS_CHANNEL`] for every written
//! row, whoever wrote it. With [`PostgresInventorySource::spawn_change_listener`]
//! running, each notification re-reads the table and publishes one snapshot. Without
//! it (or after the listener fails) the adapter publishes after its own writes only.
//!
//! Re-read and publish are serialised, so snapshots go out in the order they were read.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use sqlx::postgres::{PgListener, PgRow};
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use electra_core::{DomainError, ProductId};
use electra_events::{EventBus, InMemoryEventBus, Notification, Subscription};
use electra_inventory::{InventorySnapshot, ProductRecord, ProductStatus, StatusCorrection};

use super::{
    InventoryCatalog, InventorySource, InventorySourceError, PRODUCTS_COLLECTION,
    SnapshotNotification,
};

/// Channel notified by the `products_changed` trigger (`migrations/0002_products_notify.sql`).
pub const PRODUCTS_CHANNEL: &str = "electra_products_changed";

pub struct PostgresInventorySource {
    pool: PgPool,
    handle: Handle,
    bus: InMemoryEventBus<SnapshotNotification>,
    sequence: AtomicU64,
    publish_lock: Mutex<()>,
    // Set while the NOTIFY listener owns publication.
    listening: AtomicBool,
}

impl PostgresInventorySource {
    /// `handle` is the runtime the pool was created on.
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self {
            pool,
            handle,
            bus: InMemoryEventBus::new(),
            sequence: AtomicU64::new(0),
            publish_lock: Mutex::new(()),
            listening: AtomicBool::new(false),
        }
    }

    /// Follow every change to `products`, including writes from other processes.
    ///
    /// Once listening, local writes stop publishing on their own: the trigger fires
    /// for them too, so each write still yields exactly one snapshot. If the listener
    /// errors out, local publication resumes.
    pub async fn spawn_change_listener(self: &Arc<Self>) -> Result<JoinHandle<()>, sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(PRODUCTS_CHANNEL).await?;
        self.listening.store(true, Ordering::SeqCst);
        info!(channel = PRODUCTS_CHANNEL, "listening for product changes");

        let source = Arc::clone(self);
        Ok(tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        debug!(product_id = notification.payload(), "product change notification");
                        let s = Arc::clone(&source);
                        if let Err(e) = tokio::task::spawn_blocking(move || s.publish_current()).await {
                            warn!(channel = PRODUCTS_CHANNEL, error = %e, "snapshot publish task failed");
                        }
                    }
                    Err(e) => {
                        warn!(channel = PRODUCTS_CHANNEL, error = %e, "change listener failed, publishing local writes only");
                        source.listening.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        }))
    }

    /// Whether local writes publish themselves (no live NOTIFY listener).
    pub fn publishes_local_writes(&self) -> bool {
        !self.listening.load(Ordering::SeqCst)
    }

    fn fetch_all(&self) -> Result<Vec<ProductRecord>, InventorySourceError> {
        self.handle.block_on(async {
            let rows = sqlx::query(
                r#"
                SELECT id, name, stock, status
                FROM products
                ORDER BY id
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(row_to_record).collect()
        })
    }

    fn fetch_one(&self, id: &ProductId) -> Result<Option<ProductRecord>, InventorySourceError> {
        self.handle.block_on(async {
            let row = sqlx::query(
                r#"
                SELECT id, name, stock, status
                FROM products
                WHERE id = $1
                "#,
            )
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

            row.as_ref().map(row_to_record).transpose()
        })
    }

    fn after_write(&self) {
        if self.publishes_local_writes() {
            self.publish_current();
        }
    }

    /// Publish the current table as a snapshot. A failed re-read is logged, the write stands.
    fn publish_current(&self) {
        // Held across sequence, re-read and send: later sequences carry later reads.
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fetch_all() {
            Ok(products) => {
                let snapshot = InventorySnapshot::new(products, Utc::now());
                let notification =
                    Notification::new(seq, PRODUCTS_COLLECTION, snapshot.taken_at, snapshot);
                if let Err(e) = self.bus.publish(notification) {
                    warn!(source = PRODUCTS_COLLECTION, sequence = seq, error = ?e, "snapshot publish failed");
                }
            }
            Err(e) => {
                warn!(source = PRODUCTS_COLLECTION, sequence = seq, error = %e, "snapshot re-read failed");
            }
        }
    }

    fn write_status(&self, id: &ProductId, status: ProductStatus) -> Result<ProductRecord, InventorySourceError> {
        let updated = self.handle.block_on(async {
            let row = sqlx::query(
                r#"
                UPDATE products
                SET status = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING id, name, stock, status
                "#,
            )
            .bind(id.as_str())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => row_to_record(&row),
                None => Err(InventorySourceError::NotFound(id.clone())),
            }
        })?;
        self.after_write();
        Ok(updated)
    }
}

fn row_to_record(row: &PgRow) -> Result<ProductRecord, InventorySourceError> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(ProductRecord {
        id: ProductId::from(id.as_str()),
        name: row.try_get("name")?,
        stock: row.try_get("stock")?,
        status: status.parse::<ProductStatus>()?,
    })
}

impl InventorySource for PostgresInventorySource {
    fn read_snapshot(&self) -> Result<InventorySnapshot, InventorySourceError> {
        Ok(InventorySnapshot::new(self.fetch_all()?, Utc::now()))
    }

    fn apply_correction(&self, correction: &StatusCorrection) -> Result<(), InventorySourceError> {
        self.write_status(&correction.product_id, correction.to).map(|_| ())
    }

    fn subscribe(&self) -> Subscription<SnapshotNotification> {
        self.bus.subscribe()
    }
}

impl InventoryCatalog for PostgresInventorySource {
    fn get_product(&self, id: &ProductId) -> Result<Option<ProductRecord>, InventorySourceError> {
        self.fetch_one(id)
    }

    fn upsert_product(&self, record: ProductRecord) -> Result<ProductRecord, InventorySourceError> {
        if record.stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative").into());
        }
        self.handle.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, stock, status)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (id)
                DO UPDATE SET
                    name = EXCLUDED.name,
                    stock = EXCLUDED.stock,
                    status = EXCLUDED.status,
                    updated_at = NOW()
                "#,
            )
            .bind(record.id.as_str())
            .bind(&record.name)
            .bind(record.stock)
            .bind(record.status.as_str())
            .execute(&self.pool)
            .await
        })?;
        self.after_write();
        Ok(record)
    }

    fn adjust_stock(&self, id: &ProductId, delta: i64) -> Result<ProductRecord, InventorySourceError> {
        // Validate against the current row first so callers get a domain error
        // (not a CHECK violation); the guarded UPDATE covers concurrent writers.
        let current = self
            .fetch_one(id)?
            .ok_or_else(|| InventorySourceError::NotFound(id.clone()))?;
        current.adjusted_stock(delta)?;

        let updated = self.handle.block_on(async {
            let row = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock + $2, updated_at = NOW()
                WHERE id = $1 AND stock + $2 >= 0
                RETURNING id, name, stock, status
                "#,
            )
            .bind(id.as_str())
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?;

            match row {
                Some(row) => row_to_record(&row),
                None => Err(DomainError::invariant("stock cannot go negative").into()),
            }
        })?;
        self.after_write();
        Ok(updated)
    }

    fn set_status(&self, id: &ProductId, status: ProductStatus) -> Result<ProductRecord, InventorySourceError> {
        self.write_status(id, status)
    }
}
