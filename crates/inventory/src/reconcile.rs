//! Per-product stock decision rule.
//!
//! A reconciliation pass evaluates every product of a snapshot independently:
//!
//! 1. `stock == 0`            -> out-of-stock alert, deactivate if still active
//! 2. `0 < stock <= low`      -> low-stock alert, status untouched
//! 3. `stock > 0 && inactive` -> reactivate, no alert
//! 4. otherwise               -> nothing
//!
//! At most one branch fires. Nothing here remembers earlier passes, so an
//! unchanged depleted product raises a fresh alert on every pass.

use serde::{Deserialize, Serialize};

use electra_core::{DomainError, DomainResult, ProductId};

use crate::alert::{AlertType, NewStockAlert};
use crate::product::{InventorySnapshot, ProductRecord, ProductStatus};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Thresholds used by [`decide`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockThresholds {
    /// Inclusive upper bound of the low-stock band (`1..=low_stock`).
    low_stock: i64,
}

impl StockThresholds {
    pub fn new(low_stock: i64) -> DomainResult<Self> {
        if low_stock < 0 {
            return Err(DomainError::validation("low stock threshold cannot be negative"));
        }
        Ok(Self { low_stock })
    }

    pub fn low_stock(&self) -> i64 {
        self.low_stock
    }
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            low_stock: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// Outcome of the decision rule for a single product.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockDecision {
    /// Stock is zero. `deactivate` is true when the product is still active.
    OutOfStock { deactivate: bool },
    /// Stock is in the low band.
    LowStock,
    /// Stock came back while the product was inactive.
    Reactivate,
    NoAction,
}

impl StockDecision {
    /// Alert to append for `product`, if this decision raises one.
    pub fn alert_for(&self, product: &ProductRecord) -> Option<NewStockAlert> {
        let alert_type = match self {
            StockDecision::OutOfStock { .. } => AlertType::OutOfStock,
            StockDecision::LowStock => AlertType::LowStock,
            StockDecision::Reactivate | StockDecision::NoAction => return None,
        };
        Some(NewStockAlert {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            current_stock: product.stock,
            alert_type,
        })
    }

    /// Status to write back, if this decision corrects one.
    pub fn target_status(&self) -> Option<ProductStatus> {
        match self {
            StockDecision::OutOfStock { deactivate: true } => Some(ProductStatus::Inactive),
            StockDecision::Reactivate => Some(ProductStatus::Active),
            _ => None,
        }
    }
}

/// Evaluate the decision rule for one product.
pub fn decide(product: &ProductRecord, thresholds: &StockThresholds) -> StockDecision {
    if product.is_depleted() {
        StockDecision::OutOfStock {
            deactivate: product.is_active(),
        }
    } else if product.stock > 0 && product.stock <= thresholds.low_stock {
        StockDecision::LowStock
    } else if product.stock > 0 && !product.is_active() {
        StockDecision::Reactivate
    } else {
        StockDecision::NoAction
    }
}

/// A status write-back decided by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCorrection {
    pub product_id: ProductId,
    pub from: ProductStatus,
    pub to: ProductStatus,
}

/// Effects decided for one product of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPlan {
    pub product_id: ProductId,
    pub decision: StockDecision,
    pub alert: Option<NewStockAlert>,
    pub correction: Option<StatusCorrection>,
}

impl ProductPlan {
    pub fn is_noop(&self) -> bool {
        self.alert.is_none() && self.correction.is_none()
    }
}

/// Decide effects for every product in the snapshot, one plan per product, in snapshot order.
pub fn plan_pass(snapshot: &InventorySnapshot, thresholds: &StockThresholds) -> Vec<ProductPlan> {
    snapshot
        .iter()
        .map(|product| {
            let decision = decide(product, thresholds);
            ProductPlan {
                product_id: product.id.clone(),
                decision,
                alert: decision.alert_for(product),
                correction: decision.target_status().map(|to| StatusCorrection {
                    product_id: product.id.clone(),
                    from: product.status,
                    to,
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, stock: i64, status: ProductStatus) -> ProductRecord {
        ProductRecord::new(ProductId::from(id), format!("Product {id}"), stock, status).unwrap()
    }

    fn plan_one(p: ProductRecord) -> ProductPlan {
        let snap = InventorySnapshot::new(vec![p], Utc::now());
        plan_pass(&snap, &StockThresholds::default()).remove(0)
    }

    #[test]
    fn depleted_active_product_alerts_and_deactivates() {
        let plan = plan_one(product("p1", 0, ProductStatus::Active));

        let alert = plan.alert.expect("out of stock alert");
        assert_eq!(alert.alert_type, AlertType::OutOfStock);
        assert_eq!(alert.current_stock, 0);
        assert_eq!(
            plan.correction,
            Some(StatusCorrection {
                product_id: ProductId::from("p1"),
                from: ProductStatus::Active,
                to: ProductStatus::Inactive,
            })
        );
    }

    #[test]
    fn depleted_inactive_product_alerts_without_write() {
        let plan = plan_one(product("p1", 0, ProductStatus::Inactive));
        assert_eq!(plan.decision, StockDecision::OutOfStock { deactivate: false });
        assert!(plan.alert.is_some());
        assert!(plan.correction.is_none());
    }

    #[test]
    fn low_stock_alerts_with_current_level() {
        let plan = plan_one(product("p2", 3, ProductStatus::Active));
        let alert = plan.alert.unwrap();
        assert_eq!(alert.alert_type, AlertType::LowStock);
        assert_eq!(alert.current_stock, 3);
        assert!(plan.correction.is_none());
    }

    #[test]
    fn low_stock_does_not_reactivate() {
        // Branch 2 wins over branch 3: inactive with 1..=5 stays inactive.
        let plan = plan_one(product("p2", 5, ProductStatus::Inactive));
        assert_eq!(plan.decision, StockDecision::LowStock);
        assert!(plan.correction.is_none());
    }

    #[test]
    fn replenished_inactive_product_is_reactivated_silently() {
        let plan = plan_one(product("p3", 10, ProductStatus::Inactive));
        assert!(plan.alert.is_none());
        assert_eq!(plan.correction.unwrap().to, ProductStatus::Active);
    }

    #[test]
    fn healthy_active_product_is_left_alone() {
        let plan = plan_one(product("p4", 50, ProductStatus::Active));
        assert!(plan.is_noop());
        assert_eq!(plan.decision, StockDecision::NoAction);
    }

    #[test]
    fn threshold_is_configurable() {
        let thresholds = StockThresholds::new(20).unwrap();
        let p = product("p5", 12, ProductStatus::Active);
        assert_eq!(decide(&p, &thresholds), StockDecision::LowStock);
        assert_eq!(decide(&p, &StockThresholds::default()), StockDecision::NoAction);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert!(StockThresholds::new(-1).is_err());
    }

    #[test]
    fn one_plan_per_product_in_snapshot_order() {
        let snap = InventorySnapshot::new(
            vec![
                product("a", 0, ProductStatus::Active),
                product("b", 3, ProductStatus::Active),
                product("c", 10, ProductStatus::Inactive),
                product("d", 50, ProductStatus::Active),
            ],
            Utc::now(),
        );
        let plans = plan_pass(&snap, &StockThresholds::default());
        let ids: Vec<_> = plans.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = ProductStatus> {
            prop_oneof![Just(ProductStatus::Active), Just(ProductStatus::Inactive)]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: zero stock always raises exactly one out-of-stock alert
            /// and leaves the product inactive.
            #[test]
            fn zero_stock_always_alerts(status in any_status()) {
                let plan = plan_one(product("z", 0, status));
                prop_assert_eq!(plan.alert.map(|a| a.alert_type), Some(AlertType::OutOfStock));
                let final_status = plan.correction.map(|c| c.to).unwrap_or(status);
                prop_assert_eq!(final_status, ProductStatus::Inactive);
            }

            /// Property: 1..=5 raises one low-stock alert and never touches status.
            #[test]
            fn low_band_never_changes_status(stock in 1i64..=5, status in any_status()) {
                let plan = plan_one(product("l", stock, status));
                let alert = plan.alert.unwrap();
                prop_assert_eq!(alert.alert_type, AlertType::LowStock);
                prop_assert_eq!(alert.current_stock, stock);
                prop_assert!(plan.correction.is_none());
            }

            /// Property: above the band there is no alert and the product ends up active.
            #[test]
            fn healthy_stock_ends_active(stock in 6i64..1_000_000, status in any_status()) {
                let plan = plan_one(product("h", stock, status));
                prop_assert!(plan.alert.is_none());
                let final_status = plan.correction.map(|c| c.to).unwrap_or(status);
                prop_assert_eq!(final_status, ProductStatus::Active);
            }

            /// Property: deciding is pure (same record, same decision).
            #[test]
            fn decide_is_deterministic(stock in 0i64..100, status in any_status()) {
                let p = product("d", stock, status);
                let t = StockThresholds::default();
                prop_assert_eq!(decide(&p, &t), decide(&p, &t));
            }
        }
    }
}
