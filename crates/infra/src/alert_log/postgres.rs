//! Postgres-backed alert log (`stock_alerts` table).
//!
//! Same blocking contract as the Postgres inventory source: call from a plain
//! thread or `spawn_blocking`.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::warn;
use uuid::Uuid;

use electra_core::{AlertId, ProductId};
use electra_events::{EventBus, InMemoryEventBus, Subscription};
use electra_inventory::{AlertType, NewStockAlert, StockAlert};

use super::{AlertLog, AlertLogError};

const SELECT_COLUMNS: &str =
    "id, product_id, product_name, current_stock, alert_type, created_at, is_read";

pub struct PostgresAlertLog {
    pool: PgPool,
    handle: Handle,
    bus: InMemoryEventBus<StockAlert>,
}

impl PostgresAlertLog {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self {
            pool,
            handle,
            bus: InMemoryEventBus::new(),
        }
    }
}

fn row_to_alert(row: &PgRow) -> Result<StockAlert, AlertLogError> {
    let id: Uuid = row.try_get("id")?;
    let product_id: String = row.try_get("product_id")?;
    let alert_type: String = row.try_get("alert_type")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(StockAlert {
        id: AlertId::from_uuid(id),
        product_id: ProductId::from(product_id.as_str()),
        product_name: row.try_get("product_name")?,
        current_stock: row.try_get("current_stock")?,
        alert_type: alert_type
            .parse::<AlertType>()
            .map_err(|e| AlertLogError::Corrupt(e.to_string()))?,
        created_at,
        is_read: row.try_get("is_read")?,
    })
}

impl AlertLog for PostgresAlertLog {
    fn append(&self, alert: NewStockAlert) -> Result<StockAlert, AlertLogError> {
        let stored = alert.into_alert(AlertId::new(), Utc::now());

        self.handle.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO stock_alerts (
                    id, product_id, product_name, current_stock, alert_type, created_at, is_read
                )
                VALUES ($1, $2, $3, $4, $5, $6, FALSE)
                "#,
            )
            .bind(stored.id.as_uuid())
            .bind(stored.product_id.as_str())
            .bind(&stored.product_name)
            .bind(stored.current_stock)
            .bind(stored.alert_type.as_str())
            .bind(stored.created_at)
            .execute(&self.pool)
            .await
        })?;

        if let Err(e) = self.bus.publish(stored.clone()) {
            warn!(alert_id = %stored.id, error = ?e, "alert publish failed");
        }
        Ok(stored)
    }

    fn unread(&self) -> Result<Vec<StockAlert>, AlertLogError> {
        self.handle.block_on(async {
            let rows = sqlx::query(&format!(
                "SELECT {SELECT_COLUMNS} FROM stock_alerts WHERE is_read = FALSE ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(row_to_alert).collect()
        })
    }

    fn mark_read(&self, id: AlertId) -> Result<StockAlert, AlertLogError> {
        self.handle.block_on(async {
            let row = sqlx::query(&format!(
                "UPDATE stock_alerts SET is_read = TRUE WHERE id = $1 RETURNING {SELECT_COLUMNS}"
            ))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
            match row {
                Some(row) => row_to_alert(&row),
                None => Err(AlertLogError::NotFound(id)),
            }
        })
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<StockAlert>, AlertLogError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.handle.block_on(async {
            let rows = sqlx::query(&format!(
                "SELECT {SELECT_COLUMNS} FROM stock_alerts ORDER BY created_at DESC, id DESC LIMIT $1"
            ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(row_to_alert).collect()
        })
    }

    fn subscribe(&self) -> Subscription<StockAlert> {
        self.bus.subscribe()
    }
}
