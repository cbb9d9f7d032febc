use serde::{Deserialize, Serialize};

use stockline_core::{DomainError, DomainResult, ServiceId};

/// A sellable service. Services have no stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    id: ServiceId,
    name: String,
    /// Price in smallest currency unit (e.g., cents).
    unit_price: u64,
    unit_cost: u64,
}

impl Service {
    pub fn new(
        id: ServiceId,
        name: impl Into<String>,
        unit_price: u64,
        unit_cost: u64,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("service name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            unit_price,
            unit_cost,
        })
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    pub fn unit_cost(&self) -> u64 {
        self.unit_cost
    }
}
