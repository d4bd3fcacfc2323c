//! Catalog product model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scancart_core::ProductId;

/// A catalog product as returned by the backend.
///
/// Immutable value type; the cart snapshots the fields it needs at
/// add-to-cart time rather than holding onto the product. The backend keys
/// documents by `_id`, so deserialization accepts both spellings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price in the store currency.
    pub price: Decimal,
    /// Units in stock. May go negative on oversold inventory.
    #[serde(default)]
    pub stock_quantity: i64,
    /// Image URLs, primary first.
    #[serde(default)]
    pub images: Vec<String>,
    /// Optional long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Product {
    /// Whether any stock remains.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }
}
