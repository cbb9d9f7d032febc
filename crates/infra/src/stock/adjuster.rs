use tracing::{debug, warn};

use stockline_catalog::Product;
use stockline_core::{AggregateRoot, DomainError, ExpectedVersion, ProductId};
use stockline_sales::LineItem;

use crate::error::{SalesError, StockShortfall};
use crate::store::{SalesStore, StoreError};

/// Whether a sale takes stock out or a reversal puts it back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockDirection {
    Subtract,
    Add,
}

impl StockDirection {
    pub fn delta(self, quantity: u32) -> i64 {
        match self {
            StockDirection::Subtract => -i64::from(quantity),
            StockDirection::Add => i64::from(quantity),
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            StockDirection::Subtract => StockDirection::Add,
            StockDirection::Add => StockDirection::Subtract,
        }
    }
}

/// A partially applied adjustment.
///
/// `applied` lists the product lines already written, in order; the caller
/// owns compensating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustFailure {
    pub applied: Vec<LineItem>,
    pub error: SalesError,
}

/// Applies line item quantities to product stock, one compare-and-swap per
/// product line.
pub struct StockAdjuster<'a, S: ?Sized> {
    store: &'a S,
    max_attempts: u32,
}

impl<'a, S> StockAdjuster<'a, S>
where
    S: SalesStore + ?Sized,
{
    pub fn new(store: &'a S, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Apply every product line in order. Returns the applied lines.
    ///
    /// Lines applied before a failure are not rolled back here.
    pub fn adjust(
        &self,
        items: &[LineItem],
        direction: StockDirection,
    ) -> Result<Vec<LineItem>, AdjustFailure> {
        let mut applied = Vec::new();

        for item in items {
            let Some(product_id) = item.kind.product_id() else {
                continue;
            };
            if item.quantity == 0 {
                continue;
            }

            match self.apply_line(product_id, direction.delta(item.quantity)) {
                Ok(product) => {
                    debug!(
                        product_id = %product_id,
                        stock = product.stock(),
                        version = product.version(),
                        ?direction,
                        "stock adjusted"
                    );
                    applied.push(item.clone());
                }
                Err(error) => return Err(AdjustFailure { applied, error }),
            }
        }

        Ok(applied)
    }

    fn apply_line(&self, product_id: ProductId, delta: i64) -> Result<Product, SalesError> {
        let mut attempt = 1;
        loop {
            let product = self.store.get_product(product_id)?;
            let new_stock = product.stock_after(delta).map_err(|e| match e {
                DomainError::InvariantViolation(_) if delta < 0 => {
                    SalesError::InsufficientStock(StockShortfall {
                        product_id,
                        product_name: product.name().to_string(),
                        available: product.stock(),
                        requested: -delta,
                    })
                }
                other => SalesError::Validation(other),
            })?;

            match self.store.write_stock(
                product_id,
                new_stock,
                ExpectedVersion::Exact(product.version()),
            ) {
                Ok(written) => return Ok(written),
                Err(StoreError::Concurrency(msg)) if attempt < self.max_attempts => {
                    debug!(product_id = %product_id, attempt, %msg, "stock write raced, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    if matches!(e, StoreError::Concurrency(_)) {
                        warn!(product_id = %product_id, attempts = attempt, "stock write retries exhausted");
                    }
                    return Err(e.into());
                }
            }
        }
    }
}
