use core::fmt;

use thiserror::Error;

use stockline_core::{DomainError, ProductId, SalesOrderId};

use crate::store::StoreError;

/// Which product blocked a sale, and by how much.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub product_name: String,
    pub available: i64,
    pub requested: i64,
}

impl StockShortfall {
    /// Units missing to satisfy the request.
    pub fn missing(&self) -> i64 {
        self.requested - self.available
    }
}

impl fmt::Display for StockShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: available {}, requested {}",
            self.product_name, self.available, self.requested
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OrderOperation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OrderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderOperation::Create => "create",
            OrderOperation::Update => "update",
            OrderOperation::Delete => "delete",
        })
    }
}

/// Errors returned by the sales orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SalesError {
    #[error("order has no line items")]
    EmptyOrder,

    #[error("insufficient stock for {0}")]
    InsufficientStock(StockShortfall),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("sales order not found: {0}")]
    OrderNotFound(SalesOrderId),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// A compensation failed: stock and orders may disagree.
    #[error("stock reconciliation required for order {order_id} ({operation}, {stage}): {detail}")]
    StockReconciliation {
        order_id: SalesOrderId,
        operation: OrderOperation,
        stage: &'static str,
        detail: String,
    },
}

impl SalesError {
    /// Errors the end user can act on (shown as-is, logged at `info`).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SalesError::EmptyOrder
                | SalesError::InsufficientStock(_)
                | SalesError::Validation(_)
                | SalesError::OrderNotFound(_)
        )
    }

    pub fn requires_reconciliation(&self) -> bool {
        matches!(self, SalesError::StockReconciliation { .. })
    }
}
