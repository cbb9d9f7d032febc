//! Catalog domain module: products (stocked), services and clients.
//!
//! Product/service/client management lives outside the sales core; this crate
//! only models what the core reads, plus the stock arithmetic it owns.

pub mod client;
pub mod product;
pub mod service;

pub use client::Client;
pub use product::Product;
pub use service::Service;
