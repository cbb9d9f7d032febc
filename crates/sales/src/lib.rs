//! Sales Orders domain module.
//!
//! This crate contains business rules for sales orders, implemented purely as
//! deterministic domain logic (no IO, no storage): line items and their
//! totals, order headers and dates, order code sequencing, and the
//! filter/sort engine used to present order listings.

pub mod code;
pub mod filter;
pub mod line_item;
pub mod order;
pub mod summary;

pub use code::CodeFormat;
pub use filter::{KindFilter, OrderQuery, SortDirection, SortField, filter_and_sort};
pub use line_item::{ItemCategory, LineItem, LineKind};
pub use order::{MonthYear, OrderDate, OrderHeader, OrderListing, SalesOrder, SalesOrderDraft};
pub use summary::OrderSummary;
