//! Cart lines and money math.
//!
//! All money goes through [`rust_decimal::Decimal`]; floats never touch a
//! price. Totals are derived, never stored.

mod store;

pub use store::CartStore;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use scancart_core::ProductId;

use crate::models::Product;

/// Tax applied on top of the cart subtotal (17% GST).
pub const TAX_RATE: Decimal = Decimal::from_parts(17, 0, 0, false, 2);

/// One product in the cart.
///
/// Serialized snapshots use camelCase field names so carts written by
/// earlier app builds keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    /// Price per unit, captured when the product was added.
    pub unit_price: Decimal,
    pub quantity: u32,
    /// Always `unit_price * quantity`; recomputed on every change.
    pub subtotal: Decimal,
}

impl CartLine {
    #[must_use]
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            unit_price: product.price,
            quantity,
            subtotal: product.price * Decimal::from(quantity),
        }
    }

    /// Set the quantity and recompute the subtotal.
    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.subtotal = self.unit_price * Decimal::from(quantity);
    }
}

/// Money view of a whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// Sum of line quantities, not the number of distinct products.
    pub item_count: u32,
}

/// Compute totals over a set of cart lines.
#[must_use]
pub fn compute_totals(lines: &[CartLine]) -> CartTotals {
    let subtotal: Decimal = lines.iter().map(|line| line.subtotal).sum();
    let tax = subtotal * TAX_RATE;
    CartTotals {
        subtotal,
        tax,
        total: subtotal + tax,
        item_count: lines.iter().map(|line| line.quantity).sum(),
    }
}
