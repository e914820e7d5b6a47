//! In-memory inventory source for tests/dev.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::warn;

use electra_core::ProductId;
use electra_events::{EventBus, InMemoryEventBus, Notification, Subscription};
use electra_inventory::{InventorySnapshot, ProductRecord, ProductStatus, StatusCorrection};

use super::{
    InventoryCatalog, InventorySource, InventorySourceError, PRODUCTS_COLLECTION,
    SnapshotNotification,
};

/// Product collection held in memory, publishing a snapshot after every write.
///
/// Records are kept ordered by id so snapshots are deterministic.
#[derive(Debug, Default)]
pub struct InMemoryInventorySource {
    products: RwLock<BTreeMap<ProductId, ProductRecord>>,
    bus: InMemoryEventBus<SnapshotNotification>,
    sequence: AtomicU64,
}

impl InMemoryInventorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records without publishing (fixtures, startup loading).
    pub fn with_products(products: impl IntoIterator<Item = ProductRecord>) -> Self {
        let source = Self::new();
        if let Ok(mut map) = source.products.write() {
            for p in products {
                map.insert(p.id.clone(), p);
            }
        }
        source
    }

    fn snapshot_of(map: &BTreeMap<ProductId, ProductRecord>) -> InventorySnapshot {
        InventorySnapshot::new(map.values().cloned().collect(), Utc::now())
    }

    /// Called with the write guard held, so notifications go out in write order.
    fn publish(&self, snapshot: InventorySnapshot) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let notification = Notification::new(seq, PRODUCTS_COLLECTION, snapshot.taken_at, snapshot);
        if let Err(e) = self.bus.publish(notification) {
            warn!(source = PRODUCTS_COLLECTION, sequence = seq, error = ?e, "snapshot publish failed");
        }
    }

    /// Mutate one record and publish the resulting snapshot, all under the write lock.
    fn mutate<F>(&self, id: &ProductId, f: F) -> Result<ProductRecord, InventorySourceError>
    where
        F: FnOnce(&mut ProductRecord) -> Result<(), InventorySourceError>,
    {
        let mut map = self
            .products
            .write()
            .map_err(|_| InventorySourceError::Storage("inventory lock poisoned".to_string()))?;
        let record = map
            .get_mut(id)
            .ok_or_else(|| InventorySourceError::NotFound(id.clone()))?;
        f(record)?;
        let updated = record.clone();
        self.publish(Self::snapshot_of(&map));
        Ok(updated)
    }
}

impl InventorySource for InMemoryInventorySource {
    fn read_snapshot(&self) -> Result<InventorySnapshot, InventorySourceError> {
        let map = self
            .products
            .read()
            .map_err(|_| InventorySourceError::Storage("inventory lock poisoned".to_string()))?;
        Ok(Self::snapshot_of(&map))
    }

    fn apply_correction(&self, correction: &StatusCorrection) -> Result<(), InventorySourceError> {
        self.mutate(&correction.product_id, |record| {
            record.status = correction.to;
            Ok(())
        })
        .map(|_| ())
    }

    fn subscribe(&self) -> Subscription<SnapshotNotification> {
        self.bus.subscribe()
    }
}

impl InventoryCatalog for InMemoryInventorySource {
    fn get_product(&self, id: &ProductId) -> Result<Option<ProductRecord>, InventorySourceError> {
        let map = self
            .products
            .read()
            .map_err(|_| InventorySourceError::Storage("inventory lock poisoned".to_string()))?;
        Ok(map.get(id).cloned())
    }

    fn upsert_product(&self, record: ProductRecord) -> Result<ProductRecord, InventorySourceError> {
        let mut map = self
            .products
            .write()
            .map_err(|_| InventorySourceError::Storage("inventory lock poisoned".to_string()))?;
        map.insert(record.id.clone(), record.clone());
        self.publish(Self::snapshot_of(&map));
        Ok(record)
    }

    fn adjust_stock(&self, id: &ProductId, delta: i64) -> Result<ProductRecord, InventorySourceError> {
        self.mutate(id, |record| Ok(record.adjust_stock(delta)?))
    }

    fn set_status(&self, id: &ProductId, status: ProductStatus) -> Result<ProductRecord, InventorySourceError> {
        self.mutate(id, |record| {
            record.status = status;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use electra_core::DomainError;

    fn product(id: &str, stock: i64) -> ProductRecord {
        ProductRecord::new(ProductId::from(id), format!("Product {id}"), stock, ProductStatus::Active).unwrap()
    }

    #[test]
    fn snapshot_is_ordered_by_id() {
        let source = InMemoryInventorySource::with_products(vec![product("b", 1), product("a", 2)]);
        let snap = source.read_snapshot().unwrap();
        let ids: Vec<_> = snap.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn every_write_publishes_full_snapshot() {
        let source = InMemoryInventorySource::with_products(vec![product("a", 2), product("b", 9)]);
        let sub = source.subscribe();

        source.adjust_stock(&ProductId::from("a"), -1).unwrap();
        let first = sub.try_recv().unwrap();
        assert_eq!(first.sequence(), 1);
        assert_eq!(first.source(), PRODUCTS_COLLECTION);
        assert_eq!(first.payload().len(), 2);
        assert_eq!(first.payload().get(&ProductId::from("a")).unwrap().stock, 1);

        source.set_status(&ProductId::from("b"), ProductStatus::Inactive).unwrap();
        assert_eq!(sub.try_recv().unwrap().sequence(), 2);
    }

    #[test]
    fn concurrent_writers_publish_in_write_order() {
        let source = std::sync::Arc::new(InMemoryInventorySource::with_products(vec![product("a", 0)]));
        let sub = source.subscribe();

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let source = source.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        source.adjust_stock(&ProductId::from("a"), 1).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let mut last_seq = 0;
        let mut last_stock = 0;
        let mut delivered = 0;
        while let Ok(n) = sub.try_recv() {
            let stock = n.payload().get(&ProductId::from("a")).unwrap().stock;
            assert!(n.sequence() > last_seq, "sequence went backwards");
            assert!(stock > last_stock, "delivered stock went backwards: {last_stock} -> {stock}");
            last_seq = n.sequence();
            last_stock = stock;
            delivered += 1;
        }
        assert_eq!(delivered, 2000);
        assert_eq!(last_stock, 2000);
    }

    #[test]
    fn rejected_adjustment_does_not_write_or_publish() {
        let source = InMemoryInventorySource::with_products(vec![product("a", 2)]);
        let sub = source.subscribe();

        let err = source.adjust_stock(&ProductId::from("a"), -5).unwrap_err();
        assert!(matches!(err, InventorySourceError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(source.get_product(&ProductId::from("a")).unwrap().unwrap().stock, 2);
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn correction_on_missing_product_is_not_found() {
        let source = InMemoryInventorySource::new();
        let err = source
            .apply_correction(&StatusCorrection {
                product_id: ProductId::from("ghost"),
                from: ProductStatus::Active,
                to: ProductStatus::Inactive,
            })
            .unwrap_err();
        assert!(matches!(err, InventorySourceError::NotFound(_)));
    }

    #[test]
    fn correction_writes_target_status() {
        let source = InMemoryInventorySource::with_products(vec![product("a", 0)]);
        source
            .apply_correction(&StatusCorrection {
                product_id: ProductId::from("a"),
                from: ProductStatus::Active,
                to: ProductStatus::Inactive,
            })
            .unwrap();
        let p = source.get_product(&ProductId::from("a")).unwrap().unwrap();
        assert_eq!(p.status, ProductStatus::Inactive);
    }
}
