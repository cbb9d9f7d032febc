//! Persistent store boundary for the sales core.
//!
//! The store exposes the four record collections the core works with
//! (`products`, `sales_orders`, `line_items`, `clients`) as primitive,
//! individually committed operations. No multi-statement transaction is
//! assumed; the orchestrator composes these calls into sagas.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemorySalesStore;
pub use r#trait::{SalesStore, StoreError, StoreOp};
