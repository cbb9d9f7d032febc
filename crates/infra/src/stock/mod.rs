//! Stock verification and adjustment against the product store.

pub mod adjuster;
pub mod verifier;

pub use adjuster::{AdjustFailure, StockAdjuster, StockDirection};
pub use verifier::StockVerifier;
