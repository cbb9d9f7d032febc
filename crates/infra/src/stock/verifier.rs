use std::collections::HashMap;

use tracing::debug;

use stockline_catalog::Product;
use stockline_core::ProductId;
use stockline_sales::LineItem;

use crate::error::{SalesError, StockShortfall};
use crate::store::SalesStore;

/// Read-only availability check for a set of line items.
pub struct StockVerifier<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> StockVerifier<'a, S>
where
    S: SalesStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Fails with the first product line whose running requested quantity
    /// exceeds the stored stock. Service lines are ignored.
    pub fn verify(&self, items: &[LineItem]) -> Result<(), SalesError> {
        let mut seen: HashMap<ProductId, (Product, i64)> = HashMap::new();

        for item in items {
            let Some(product_id) = item.kind.product_id() else {
                continue;
            };

            let (product, requested) = match seen.entry(product_id) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert((self.store.get_product(product_id)?, 0))
                }
            };
            *requested += i64::from(item.quantity);

            if !product.can_fulfil(*requested) {
                debug!(
                    product_id = %product_id,
                    available = product.stock(),
                    requested = *requested,
                    "stock check failed"
                );
                return Err(SalesError::InsufficientStock(StockShortfall {
                    product_id,
                    product_name: product.name().to_string(),
                    available: product.stock(),
                    requested: *requested,
                }));
            }
        }

        Ok(())
    }
}
