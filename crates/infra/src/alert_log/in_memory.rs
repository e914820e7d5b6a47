//! In-memory alert log for tests/dev.

use std::sync::RwLock;

use chrono::Utc;
use tracing::warn;

use electra_core::AlertId;
use electra_events::{EventBus, InMemoryEventBus, Subscription};
use electra_inventory::{NewStockAlert, StockAlert};

use super::{AlertLog, AlertLogError};

#[derive(Debug, Default)]
pub struct InMemoryAlertLog {
    // Append order == creation order.
    alerts: RwLock<Vec<StockAlert>>,
    bus: InMemoryEventBus<StockAlert>,
}

impl InMemoryAlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every alert ever appended, oldest first.
    pub fn all(&self) -> Vec<StockAlert> {
        self.alerts.read().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> AlertLogError {
    AlertLogError::Storage("alert log lock poisoned".to_string())
}

impl AlertLog for InMemoryAlertLog {
    fn append(&self, alert: NewStockAlert) -> Result<StockAlert, AlertLogError> {
        let stored = alert.into_alert(AlertId::new(), Utc::now());
        self.alerts.write().map_err(|_| poisoned())?.push(stored.clone());

        if let Err(e) = self.bus.publish(stored.clone()) {
            warn!(alert_id = %stored.id, error = ?e, "alert publish failed");
        }
        Ok(stored)
    }

    fn unread(&self) -> Result<Vec<StockAlert>, AlertLogError> {
        let alerts = self.alerts.read().map_err(|_| poisoned())?;
        Ok(alerts.iter().rev().filter(|a| !a.is_read).cloned().collect())
    }

    fn mark_read(&self, id: AlertId) -> Result<StockAlert, AlertLogError> {
        let mut alerts = self.alerts.write().map_err(|_| poisoned())?;
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AlertLogError::NotFound(id))?;
        alert.mark_read();
        Ok(alert.clone())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<StockAlert>, AlertLogError> {
        let alerts = self.alerts.read().map_err(|_| poisoned())?;
        Ok(alerts.iter().rev().take(limit).cloned().collect())
    }

    fn subscribe(&self) -> Subscription<StockAlert> {
        self.bus.subscribe()
    }
}
