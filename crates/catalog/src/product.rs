use serde::{Deserialize, Serialize};

use stockline_core::{AggregateRoot, DomainError, DomainResult, ProductId};

/// Aggregate root: Product.
///
/// Pricing and naming are owned by product management; the sales core only
/// ever changes `stock`, and every such write bumps `version` so concurrent
/// writers can detect each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    /// Price in smallest currency unit (e.g., cents).
    sale_price: u64,
    unit_cost: u64,
    stock: i64,
    version: u64,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        sale_price: u64,
        unit_cost: u64,
        stock: i64,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        Ok(Self {
            id,
            name,
            sale_price,
            unit_cost,
            stock,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sale_price(&self) -> u64 {
        self.sale_price
    }

    pub fn unit_cost(&self) -> u64 {
        self.unit_cost
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    /// Whether `quantity` units can be taken from the current stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }

    /// Stock level after applying `delta`, without mutating.
    pub fn stock_after(&self, delta: i64) -> DomainResult<i64> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let new_stock = self
            .stock
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("stock overflow"))?;
        if new_stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        Ok(new_stock)
    }

    /// Record a committed stock write. Only stores call this.
    pub fn record_stock_write(&mut self, stock: i64) {
        self.stock = stock;
        self.version += 1;
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
