//! Recently scanned products.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::Product;

/// Most-recently-scanned products, newest first.
///
/// Re-scanning a product moves it to the front instead of duplicating it;
/// the oldest entry falls off past [`Self::CAPACITY`]. Session-scoped and
/// never persisted.
///
/// Cheap to clone; all clones share the same list.
#[derive(Clone, Default)]
pub struct RecentProducts {
    inner: Arc<Mutex<VecDeque<Product>>>,
}

impl RecentProducts {
    /// Maximum number of products kept.
    pub const CAPACITY: usize = 10;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `product` at the front of the list.
    pub fn record(&self, product: Product) {
        let mut recents = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        recents.retain(|seen| seen.id != product.id);
        recents.push_front(product);
        recents.truncate(Self::CAPACITY);
    }

    /// Snapshot of the list, newest first.
    #[must_use]
    pub fn list(&self) -> Vec<Product> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use scancart_core::ProductId;

    use super::*;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::ONE,
            stock_quantity: 1,
            images: Vec::new(),
            description: None,
        }
    }

    #[test]
    fn test_newest_first() {
        let recents = RecentProducts::new();
        recents.record(product("a"));
        recents.record(product("b"));
        let ids: Vec<_> = recents.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProductId::new("b"), ProductId::new("a")]);
    }

    #[test]
    fn test_rescan_moves_to_front_without_duplicate() {
        let recents = RecentProducts::new();
        recents.record(product("a"));
        recents.record(product("b"));
        recents.record(product("a"));
        let ids: Vec<_> = recents.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProductId::new("a"), ProductId::new("b")]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let recents = RecentProducts::new();
        for n in 0..12 {
            recents.record(product(&format!("p{n}")));
        }
        let listed = recents.list();
        assert_eq!(listed.len(), RecentProducts::CAPACITY);
        assert_eq!(listed.first().unwrap().id, ProductId::new("p11"));
        assert_eq!(listed.last().unwrap().id, ProductId::new("p2"));
    }
}
