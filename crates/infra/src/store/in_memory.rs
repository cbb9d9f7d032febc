use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use stockline_catalog::{Client, Product};
use stockline_core::{AggregateRoot, ClientId, ExpectedVersion, ProductId, SalesOrderId};
use stockline_sales::{LineItem, OrderHeader};

use super::r#trait::{SalesStore, StoreError, StoreOp};

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    clients: HashMap<ClientId, Client>,
    /// Insertion order is kept so listing ties stay stable.
    orders: Vec<OrderHeader>,
    line_items: HashMap<SalesOrderId, Vec<LineItem>>,
}

/// In-memory sales store.
///
/// Intended for tests/dev. Every call takes the table lock once, so each
/// method is atomic on its own, and nothing spans two calls.
#[derive(Debug, Default)]
pub struct InMemorySalesStore {
    tables: RwLock<Tables>,
    /// Pending injected failures: op -> number of calls to let through first.
    faults: Mutex<HashMap<StoreOp, usize>>,
}

impl InMemorySalesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product (replaces any product with the same id).
    pub fn insert_product(&self, product: Product) {
        if let Ok(mut tables) = self.tables.write() {
            tables.products.insert(product.id_typed(), product);
        }
    }

    /// Seed a client.
    pub fn insert_client(&self, client: Client) {
        if let Ok(mut tables) = self.tables.write() {
            tables.clients.insert(client.id, client);
        }
    }

    /// Snapshot of every product, for invariant checks.
    pub fn products(&self) -> Vec<Product> {
        self.tables
            .read()
            .map(|tables| tables.products.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Fail the call to `op` that comes after `skip` successful ones.
    ///
    /// The fault fires once and is then cleared.
    pub fn fail_on(&self, op: StoreOp, skip: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.insert(op, skip);
        }
    }

    /// Drop every pending fault.
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.clear();
        }
    }

    fn trip(&self, op: StoreOp) -> Result<(), StoreError> {
        let mut faults = self
            .faults
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        match faults.get_mut(&op) {
            Some(0) => {
                faults.remove(&op);
                Err(StoreError::Storage(format!("injected failure on {op:?}")))
            }
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn read(&self, op: StoreOp) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.trip(op)?;
        self.tables
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self, op: StoreOp) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.trip(op)?;
        self.tables
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }
}

fn guard(
    expected: ExpectedVersion,
    actual: u64,
    record: impl FnOnce() -> String,
) -> Result<(), StoreError> {
    expected
        .check(actual)
        .map_err(|e| StoreError::Concurrency(format!("{}: {e}", record())))
}

impl SalesStore for InMemorySalesStore {
    fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let tables = self.read(StoreOp::GetProduct)?;
        tables
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    fn write_stock(
        &self,
        id: ProductId,
        stock: i64,
        expected: ExpectedVersion,
    ) -> Result<Product, StoreError> {
        let mut tables = self.write(StoreOp::WriteStock)?;
        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;

        guard(expected, product.version(), || format!("product {id}"))?;
        if stock < 0 {
            return Err(StoreError::Constraint(format!(
                "product {id}: stock cannot be negative ({stock})"
            )));
        }

        product.record_stock_write(stock);
        Ok(product.clone())
    }

    fn get_client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        let tables = self.read(StoreOp::GetClient)?;
        Ok(tables.clients.get(&id).cloned())
    }

    fn insert_order(&self, header: &OrderHeader) -> Result<(), StoreError> {
        let mut tables = self.write(StoreOp::InsertOrder)?;
        if tables.orders.iter().any(|o| o.id == header.id) {
            return Err(StoreError::Duplicate(format!("sales order {}", header.id)));
        }
        tables.orders.push(header.clone());
        Ok(())
    }

    fn update_order(
        &self,
        header: &OrderHeader,
        expected: ExpectedVersion,
    ) -> Result<OrderHeader, StoreError> {
        let mut tables = self.write(StoreOp::UpdateOrder)?;
        let stored = tables
            .orders
            .iter_mut()
            .find(|o| o.id == header.id)
            .ok_or_else(|| StoreError::NotFound(format!("sales order {}", header.id)))?;

        guard(expected, stored.version, || format!("sales order {}", header.id))?;

        let version = stored.version + 1;
        *stored = OrderHeader {
            version,
            ..header.clone()
        };
        Ok(stored.clone())
    }

    fn delete_order(&self, id: SalesOrderId, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut tables = self.write(StoreOp::DeleteOrder)?;
        let idx = tables
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("sales order {id}")))?;
        guard(expected, tables.orders[idx].version, || format!("sales order {id}"))?;
        tables.orders.remove(idx);
        Ok(())
    }

    fn get_order(&self, id: SalesOrderId) -> Result<Option<OrderHeader>, StoreError> {
        let tables = self.read(StoreOp::GetOrder)?;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    fn list_orders(&self) -> Result<Vec<OrderHeader>, StoreError> {
        let tables = self.read(StoreOp::ListOrders)?;
        let mut orders = tables.orders.clone();
        // Stable: equal dates keep insertion order; unparseable dates go last.
        orders.sort_by(|a, b| b.order_date.timestamp().cmp(&a.order_date.timestamp()));
        Ok(orders)
    }

    fn max_order_code(&self, prefix: &str) -> Result<Option<String>, StoreError> {
        let tables = self.read(StoreOp::MaxOrderCode)?;
        Ok(tables
            .orders
            .iter()
            .filter_map(|o| {
                let sequence = o
                    .code
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .filter(|digits| {
                        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
                    })
                    .and_then(|digits| digits.parse::<u32>().ok())?;
                Some((sequence, o.code.as_str()))
            })
            .max_by_key(|(sequence, _)| *sequence)
            .map(|(_, code)| code.to_string()))
    }

    fn insert_line_items(
        &self,
        order_id: SalesOrderId,
        items: &[LineItem],
    ) -> Result<(), StoreError> {
        let mut tables = self.write(StoreOp::InsertLineItems)?;
        if !tables.orders.iter().any(|o| o.id == order_id) {
            return Err(StoreError::Constraint(format!(
                "line items reference missing sales order {order_id}"
            )));
        }
        tables
            .line_items
            .entry(order_id)
            .or_default()
            .extend(items.iter().cloned());
        Ok(())
    }

    fn delete_line_items(&self, order_id: SalesOrderId) -> Result<(), StoreError> {
        let mut tables = self.write(StoreOp::DeleteLineItems)?;
        tables.line_items.remove(&order_id);
        Ok(())
    }

    fn list_line_items(&self, order_id: SalesOrderId) -> Result<Vec<LineItem>, StoreError> {
        let tables = self.read(StoreOp::ListLineItems)?;
        Ok(tables.line_items.get(&order_id).cloned().unwrap_or_default())
    }
}
