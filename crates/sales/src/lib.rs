//! Sales domain module: cart arithmetic and order fulfillment planning.
//!
//! Pure, deterministic logic (no IO). Stock is changed by the infrastructure
//! layer applying the [`StockDecrement`]s a cart produces.

pub mod cart;

pub use cart::{Cart, CartLine, OrderTotals, StockDecrement};
