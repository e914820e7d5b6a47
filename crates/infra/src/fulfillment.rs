//! Order fulfillment: applies a cart's stock decrements to the inventory.
//!
//! This is the "other writer" of the product collection. Each line is applied
//! independently; a line that fails (unknown product, insufficient stock) is
//! reported and does not undo lines already applied.

use serde::Serialize;
use tracing::{info, warn};

use electra_core::{DomainResult, ProductId};
use electra_sales::{Cart, OrderTotals};

use crate::inventory_source::InventoryCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LineOutcome {
    Fulfilled { product_id: ProductId, remaining_stock: i64 },
    Failed { product_id: ProductId, error: String },
}

impl LineOutcome {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, LineOutcome::Fulfilled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FulfillmentReport {
    pub totals: OrderTotals,
    pub lines: Vec<LineOutcome>,
}

impl FulfillmentReport {
    pub fn fully_fulfilled(&self) -> bool {
        self.lines.iter().all(LineOutcome::is_fulfilled)
    }
}

/// Price the cart, then decrement stock for each product in it.
///
/// Pricing errors (empty cart, overflow) fail the whole call before any stock moves.
pub fn fulfill_order<C>(catalog: &C, cart: &Cart, delivery_fee: u64) -> DomainResult<FulfillmentReport>
where
    C: InventoryCatalog + ?Sized,
{
    let totals = cart.totals(delivery_fee)?;

    let lines = cart
        .fulfillment_plan()
        .into_iter()
        .map(|dec| match catalog.adjust_stock(&dec.product_id, dec.delta) {
            Ok(record) => LineOutcome::Fulfilled {
                product_id: dec.product_id,
                remaining_stock: record.stock,
            },
            Err(e) => {
                warn!(product_id = %dec.product_id, delta = dec.delta, error = %e, "fulfillment line failed");
                LineOutcome::Failed {
                    product_id: dec.product_id,
                    error: e.to_string(),
                }
            }
        })
        .collect::<Vec<_>>();

    info!(
        lines = lines.len(),
        items = cart.item_count(),
        failed = lines.iter().filter(|l| !l.is_fulfilled()).count(),
        total = totals.total,
        "order fulfillment applied"
    );

    Ok(FulfillmentReport { totals, lines })
}
