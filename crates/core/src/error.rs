//! Errors raised by the pure sales model (catalog, orders, ids).

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic rejection of a value or a state change.
///
/// Store, stock and saga failures are modelled in `stockline-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input: empty names, zero quantities, bad `MM/YYYY`.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Arithmetic or stock rule broken: negative stock, amount overflow.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Stale revision of a product or order header.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
