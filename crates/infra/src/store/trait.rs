use std::sync::Arc;

use thiserror::Error;

use stockline_catalog::{Client, Product};
use stockline_core::{ClientId, ExpectedVersion, ProductId, SalesOrderId};
use stockline_sales::{LineItem, OrderHeader};

/// Store operation error.
///
/// These are **infrastructure errors** (missing rows, lost compare-and-swap
/// races, backend failures) as opposed to domain errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Primitive store operations, used for tracing and fault injection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetProduct,
    WriteStock,
    GetClient,
    InsertOrder,
    UpdateOrder,
    DeleteOrder,
    GetOrder,
    ListOrders,
    MaxOrderCode,
    InsertLineItems,
    DeleteLineItems,
    ListLineItems,
}

/// Record collections backing the sales core.
///
/// Every method is a single committed write or read. Implementations must:
/// - reject `write_stock` / `update_order` / `delete_order` when the stored version does not
///   match `expected` (`StoreError::Concurrency`)
/// - bump the stored version by exactly one on every successful
///   `write_stock` / `update_order`
/// - reject negative stock (`StoreError::Constraint`)
/// - return `list_orders` newest-first by order date, ties in insertion order
pub trait SalesStore: Send + Sync {
    // products
    fn get_product(&self, id: ProductId) -> Result<Product, StoreError>;

    /// Compare-and-swap of a product's stock counter.
    fn write_stock(
        &self,
        id: ProductId,
        stock: i64,
        expected: ExpectedVersion,
    ) -> Result<Product, StoreError>;

    // clients (read-only)
    fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError>;

    // sales_orders
    fn insert_order(&self, header: &OrderHeader) -> Result<(), StoreError>;

    /// Overwrite header fields; returns the stored header with its new version.
    fn update_order(
        &self,
        header: &OrderHeader,
        expected: ExpectedVersion,
    ) -> Result<OrderHeader, StoreError>;

    /// Remove a header, guarded by its version.
    fn delete_order(&self, id: SalesOrderId, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn get_order(&self, id: SalesOrderId) -> Result<Option<OrderHeader>, StoreError>;

    fn list_orders(&self) -> Result<Vec<OrderHeader>, StoreError>;

    /// Code `PREFIX-N` with the highest numeric `N` for `prefix`, if any.
    /// Codes with another prefix or a non-numeric suffix are ignored.
    fn max_order_code(&self, prefix: &str) -> Result<Option<String>, StoreError>;

    // line_items
    fn insert_line_items(&self, order_id: SalesOrderId, items: &[LineItem])
    -> Result<(), StoreError>;

    fn delete_line_items(&self, order_id: SalesOrderId) -> Result<(), StoreError>;

    fn list_line_items(&self, order_id: SalesOrderId) -> Result<Vec<LineItem>, StoreError>;
}

impl<S> SalesStore for Arc<S>
where
    S: SalesStore + ?Sized,
{
    fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).get_product(id)
    }

    fn write_stock(
        &self,
        id: ProductId,
        stock: i64,
        expected: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        (**self).write_stock(id, stock, expected)
    }

    fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        (**self).get_client(id)
    }

    fn insert_order(&self, header: &OrderHeader) -> Result<(), StoreError> {
        (**self).insert_order(header)
    }

    fn update_order(
        &self,
        header: &OrderHeader,
        expected: ExpectedVersion,
    ) -> Result<OrderHeader, StoreError> {
        (**self).update_order(header, expected)
    }

    fn delete_order(&self, id: SalesOrderId, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).delete_order(id, expected)
    }

    fn get_order(&self, id: SalesOrderId) -> Result<Option<OrderHeader>, StoreError> {
        (**self).get_order(id)
    }

    fn list_orders(&self) -> Result<Vec<OrderHeader>, StoreError> {
        (**self).list_orders()
    }

    fn max_order_code(&self, prefix: &str) -> Result<Option<String>, StoreError> {
        (**self).max_order_code(prefix)
    }

    fn insert_line_items(
        &self,
        order_id: SalesOrderId,
        items: &[LineItem],
    ) -> Result<(), StoreError> {
        (**self).insert_line_items(order_id, items)
    }

    fn delete_line_items(&self, order_id: SalesOrderId) -> Result<(), StoreError> {
        (**self).delete_line_items(order_id)
    }

    fn list_line_items(&self, order_id: SalesOrderId) -> Result<Vec<LineItem>, StoreError> {
        (**self).list_line_items(order_id)
    }
}
