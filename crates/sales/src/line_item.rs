use serde::{Deserialize, Serialize};

use stockline_catalog::{Product, Service};
use stockline_core::{DomainError, DomainResult, ProductId, ServiceId};

/// What a line item sells. Product lines draw from stock; service lines don't.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LineKind {
    Product(ProductId),
    Service(ServiceId),
}

/// Kind of a line item without its reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Product,
    Service,
}

impl LineKind {
    pub fn category(&self) -> ItemCategory {
        match self {
            LineKind::Product(_) => ItemCategory::Product,
            LineKind::Service(_) => ItemCategory::Service,
        }
    }

    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            LineKind::Product(id) => Some(*id),
            LineKind::Service(_) => None,
        }
    }
}

/// One product or service entry within a sales order.
///
/// The line total is always derived from `quantity × unit_price`; it is never
/// stored next to its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineKind,
    /// Display name captured at sale time.
    pub name: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub unit_cost: u64,
}

impl LineItem {
    /// Line for a catalog product at its current sale price.
    pub fn for_product(product: &Product, quantity: u32) -> Self {
        Self {
            kind: LineKind::Product(product.id_typed()),
            name: product.name().to_string(),
            quantity,
            unit_price: product.sale_price(),
            unit_cost: product.unit_cost(),
        }
    }

    /// Line for a catalog service at its current price.
    pub fn for_service(service: &Service, quantity: u32) -> Self {
        Self {
            kind: LineKind::Service(service.id()),
            name: service.name().to_string(),
            quantity,
            unit_price: service.unit_price(),
            unit_cost: service.unit_cost(),
        }
    }

    pub fn with_unit_price(mut self, unit_price: u64) -> Self {
        self.unit_price = unit_price;
        self
    }

    /// `quantity × unit_price`, saturating. Validated lines never saturate.
    pub fn total(&self) -> u64 {
        u64::from(self.quantity).saturating_mul(self.unit_price)
    }

    pub fn cost(&self) -> u64 {
        u64::from(self.quantity).saturating_mul(self.unit_cost)
    }

    pub fn checked_total(&self) -> DomainResult<u64> {
        u64::from(self.quantity)
            .checked_mul(self.unit_price)
            .ok_or_else(|| DomainError::invariant(format!("line amount overflow (item: {})", self.name)))
    }

    pub fn checked_cost(&self) -> DomainResult<u64> {
        u64::from(self.quantity)
            .checked_mul(self.unit_cost)
            .ok_or_else(|| DomainError::invariant(format!("line cost overflow (item: {})", self.name)))
    }

    pub fn category(&self) -> ItemCategory {
        self.kind.category()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive (item: {})",
                self.name
            )));
        }
        self.checked_total()?;
        self.checked_cost()?;
        Ok(())
    }
}
