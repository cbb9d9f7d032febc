//! Saga runner: ordered steps, each with a compensation.
//!
//! The store offers no multi-statement transaction, so every order mutation
//! runs as a saga:
//! - steps execute in order
//! - when a step fails, that step first undoes its own partial work, then
//!   every completed step is compensated in reverse order
//! - compensation is best-effort; every remaining step is still attempted
//!   after one fails
//! - if all compensations succeed the original error is returned, otherwise
//!   a `StockReconciliation` error carrying the failed stage

pub mod steps;

use core::fmt;

use tracing::{debug, error, info_span, warn};

use stockline_core::SalesOrderId;

use crate::error::{OrderOperation, SalesError};
use crate::store::SalesStore;

pub use steps::{
    AdjustStock, ClaimHeader, DeleteHeader, DeleteLineItems, InsertHeader, InsertLineItems,
    ReplaceLineItems, UpdateHeader, VerifyStock,
};

/// Saga progress as seen in traces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SagaPhase {
    Verifying,
    Persisting,
    AdjustingStock,
    Committed,
    Aborted,
}

impl fmt::Display for SagaPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SagaPhase::Verifying => "verifying",
            SagaPhase::Persisting => "persisting",
            SagaPhase::AdjustingStock => "adjusting_stock",
            SagaPhase::Committed => "committed",
            SagaPhase::Aborted => "aborted",
        })
    }
}

/// One unit of saga work.
///
/// Steps record what they actually wrote, so `compensate` is correct after a
/// full success, a partial failure, or no effect at all.
pub trait SagaStep {
    /// Stable stage name, reported on reconciliation errors.
    fn name(&self) -> &'static str;

    fn phase(&self) -> SagaPhase;

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError>;

    fn compensate(&mut self, _store: &dyn SalesStore) -> Result<(), SalesError> {
        Ok(())
    }
}

/// An ordered list of steps for one order operation.
pub struct Saga<'a> {
    operation: OrderOperation,
    order_id: SalesOrderId,
    steps: Vec<Box<dyn SagaStep + 'a>>,
}

impl<'a> Saga<'a> {
    pub fn new(operation: OrderOperation, order_id: SalesOrderId) -> Self {
        Self {
            operation,
            order_id,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl SagaStep + 'a) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn run(mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        let span = info_span!("saga", operation = %self.operation, order_id = %self.order_id);
        let _guard = span.enter();

        let mut phase = None;
        for idx in 0..self.steps.len() {
            let step = &mut self.steps[idx];
            if phase != Some(step.phase()) {
                phase = Some(step.phase());
                debug!(phase = %step.phase(), "saga phase");
            }

            if let Err(cause) = step.execute(store) {
                debug!(step = step.name(), error = %cause, "saga step failed");
                return Err(self.abort(idx, store, cause));
            }
        }

        debug!(phase = %SagaPhase::Committed, "saga phase");
        Ok(())
    }

    /// Compensate the failed step `failed` and everything before it.
    fn abort(&mut self, failed: usize, store: &dyn SalesStore, cause: SalesError) -> SalesError {
        let mut first_failure: Option<(&'static str, SalesError)> = None;
        let mut failures = 0usize;

        for step in self.steps[..=failed].iter_mut().rev() {
            if let Err(e) = step.compensate(store) {
                failures += 1;
                error!(step = step.name(), error = %e, "compensation failed");
                if first_failure.is_none() {
                    first_failure = Some((step.name(), e));
                }
            }
        }

        debug!(phase = %SagaPhase::Aborted, "saga phase");

        match first_failure {
            None => cause,
            Some((stage, e)) => {
                warn!(failures, "saga aborted with unreconciled state");
                SalesError::StockReconciliation {
                    order_id: self.order_id,
                    operation: self.operation,
                    stage,
                    detail: format!("{e} (after: {cause}; failed compensations: {failures})"),
                }
            }
        }
    }
}
