use serde::Deserialize;

use electra_core::{DomainResult, ProductId};
use electra_inventory::{ProductRecord, ProductStatus};
use electra_sales::{Cart, CartLine};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    /// Optional caller-chosen id; generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub stock: i64,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: u64,
}

#[derive(Debug, Deserialize)]
pub struct FulfillOrderRequest {
    pub lines: Vec<CartLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub limit: Option<usize>,
}

// -------------------------
// Mapping
// -------------------------

impl CreateProductRequest {
    pub fn into_record(self) -> DomainResult<ProductRecord> {
        let id = match self.id {
            Some(raw) => raw.parse::<ProductId>()?,
            None => ProductId::generate(),
        };
        // New stock-less products start hidden.
        let status = match self.status {
            Some(s) => s.parse::<ProductStatus>()?,
            None if self.stock == 0 => ProductStatus::Inactive,
            None => ProductStatus::Active,
        };
        ProductRecord::new(id, self.name, self.stock, status)
    }
}

impl FulfillOrderRequest {
    pub fn into_cart(self) -> DomainResult<Cart> {
        let lines = self
            .lines
            .into_iter()
            .map(|l| CartLine::new(l.product_id.parse::<ProductId>()?, l.quantity, l.unit_price))
            .collect::<DomainResult<Vec<_>>>()?;
        Cart::from_lines(lines)
    }
}

pub fn product_to_json(p: &ProductRecord) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.as_str(),
        "name": p.name,
        "stock": p.stock,
        "status": p.status.as_str(),
    })
}
