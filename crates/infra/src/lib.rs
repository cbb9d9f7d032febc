//! Infrastructure layer: store boundary, stock control, and the order sagas.
//!
//! The sales core runs on a store without multi-statement transactions. Order
//! mutations are composed from single committed calls and undone step by step
//! on failure (see [`saga`]).

pub mod code_generator;
pub mod config;
pub mod error;
pub mod order_cache;
pub mod orchestrator;
pub mod saga;
pub mod stock;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use code_generator::{GeneratedCode, OrderCodeGenerator};
pub use config::SalesConfig;
pub use error::{OrderOperation, SalesError, StockShortfall};
pub use order_cache::OrderListCache;
pub use orchestrator::SalesOrderService;
pub use store::{InMemorySalesStore, SalesStore, StoreError, StoreOp};
