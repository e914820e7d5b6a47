use serde::{Deserialize, Serialize};

use electra_core::{DomainError, DomainResult, ProductId};

/// Cart line: product, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (kobo).
    pub unit_price: u64,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: i64, unit_price: u64) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if unit_price == 0 {
            return Err(DomainError::validation("unit_price must be positive"));
        }
        Ok(Self {
            product_id,
            quantity,
            unit_price,
        })
    }

    pub fn line_total(&self) -> DomainResult<u64> {
        let qty = u64::try_from(self.quantity)
            .map_err(|_| DomainError::invariant("quantity must be positive"))?;
        qty.checked_mul(self.unit_price)
            .ok_or_else(|| DomainError::invariant("line total overflow"))
    }
}

/// Amounts charged for an order, all in minor units.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: u64,
    pub delivery_fee: u64,
    pub total: u64,
}

/// Stock change required to fulfill one product of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecrement {
    pub product_id: ProductId,
    /// Always negative.
    pub delta: i64,
}

/// Shopping cart.
///
/// Lines are keyed by product: adding a product that is already in the cart
/// increases its quantity (the unit price must match).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from raw lines, merging duplicates.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> DomainResult<Self> {
        let mut cart = Self::new();
        for line in lines {
            cart.add_line(line)?;
        }
        Ok(cart)
    }

    pub fn add_line(&mut self, line: CartLine) -> DomainResult<()> {
        if line.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        match self.lines.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => {
                if existing.unit_price != line.unit_price {
                    return Err(DomainError::validation(format!(
                        "conflicting unit_price for product {}",
                        line.product_id
                    )));
                }
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
            }
            None => self.lines.push(line),
        }
        Ok(())
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> DomainResult<u64> {
        self.lines.iter().try_fold(0u64, |acc, line| {
            acc.checked_add(line.line_total()?)
                .ok_or_else(|| DomainError::invariant("subtotal overflow"))
        })
    }

    /// Totals for checkout. An empty cart cannot be checked out.
    pub fn totals(&self, delivery_fee: u64) -> DomainResult<OrderTotals> {
        if self.is_empty() {
            return Err(DomainError::validation("cart is empty"));
        }
        let subtotal = self.subtotal()?;
        let total = subtotal
            .checked_add(delivery_fee)
            .ok_or_else(|| DomainError::invariant("order total overflow"))?;
        Ok(OrderTotals {
            subtotal,
            delivery_fee,
            total,
        })
    }

    /// Stock decrements needed to fulfill this cart, one per product.
    pub fn fulfillment_plan(&self) -> Vec<StockDecrement> {
        self.lines
            .iter()
            .map(|l| StockDecrement {
                product_id: l.product_id.clone(),
                delta: -l.quantity,
            })
            .collect()
    }
}
