//! Concrete saga steps for sales order mutations.

use stockline_core::{ExpectedVersion, SalesOrderId};
use stockline_sales::{LineItem, OrderHeader};

use super::{SagaPhase, SagaStep};
use crate::error::SalesError;
use crate::stock::{StockAdjuster, StockDirection, StockVerifier};
use crate::store::SalesStore;

/// Availability check. Nothing to undo.
pub struct VerifyStock {
    items: Vec<LineItem>,
}

impl VerifyStock {
    pub fn new(items: Vec<LineItem>) -> Self {
        Self { items }
    }
}

impl SagaStep for VerifyStock {
    fn name(&self) -> &'static str {
        "verify stock"
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Verifying
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        StockVerifier::new(store).verify(&self.items)
    }
}

pub struct InsertHeader {
    header: OrderHeader,
    inserted: bool,
}

impl InsertHeader {
    pub fn new(header: OrderHeader) -> Self {
        Self {
            header,
            inserted: false,
        }
    }
}

impl SagaStep for InsertHeader {
    fn name(&self) -> &'static str {
        "insert order header"
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Persisting
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        store.insert_order(&self.header)?;
        self.inserted = true;
        Ok(())
    }

    fn compensate(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        if self.inserted {
            store.delete_order(self.header.id, ExpectedVersion::Any)?;
            self.inserted = false;
        }
        Ok(())
    }
}

pub struct InsertLineItems {
    order_id: SalesOrderId,
    items: Vec<LineItem>,
    inserted: bool,
}

impl InsertLineItems {
    pub fn new(order_id: SalesOrderId, items: Vec<LineItem>) -> Self {
        Self {
            order_id,
            items,
            inserted: false,
        }
    }
}

impl SagaStep for InsertLineItems {
    fn name(&self) -> &'static str {
        "insert line items"
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Persisting
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        store.insert_line_items(self.order_id, &self.items)?;
        self.inserted = true;
        Ok(())
    }

    fn compensate(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        if self.inserted {
            store.delete_line_items(self.order_id)?;
            self.inserted = false;
        }
        Ok(())
    }
}

/// Stock movement for a set of lines.
///
/// Partial application is remembered, so compensation only reverses the
/// lines that were actually written.
pub struct AdjustStock {
    stage: &'static str,
    items: Vec<LineItem>,
    direction: StockDirection,
    max_attempts: u32,
    applied: Vec<LineItem>,
}

impl AdjustStock {
    pub fn new(
        stage: &'static str,
        items: Vec<LineItem>,
        direction: StockDirection,
        max_attempts: u32,
    ) -> Self {
        Self {
            stage,
            items,
            direction,
            max_attempts,
            applied: Vec::new(),
        }
    }

    pub fn subtract(items: Vec<LineItem>, max_attempts: u32) -> Self {
        Self::new("subtract stock", items, StockDirection::Subtract, max_attempts)
    }

    pub fn restore(items: Vec<LineItem>, max_attempts: u32) -> Self {
        Self::new("return stock", items, StockDirection::Add, max_attempts)
    }
}

impl SagaStep for AdjustStock {
    fn name(&self) -> &'static str {
        self.stage
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::AdjustingStock
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        match StockAdjuster::new(store, self.max_attempts).adjust(&self.items, self.direction) {
            Ok(applied) => {
                self.applied = applied;
                Ok(())
            }
            Err(failure) => {
                self.applied = failure.applied;
                Err(failure.error)
            }
        }
    }

    fn compensate(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        if self.applied.is_empty() {
            return Ok(());
        }
        let adjuster = StockAdjuster::new(store, self.max_attempts);
        match adjuster.adjust(&self.applied, self.direction.reversed()) {
            Ok(_) => {
                self.applied.clear();
                Ok(())
            }
            Err(failure) => {
                // Keep only what is still outstanding.
                let undone = failure.applied.len();
                self.applied.drain(..undone);
                Err(failure.error)
            }
        }
    }
}

/// Header overwrite guarded by the header version read before the saga.
pub struct UpdateHeader {
    next: OrderHeader,
    previous: OrderHeader,
    written: Option<OrderHeader>,
}

impl UpdateHeader {
    pub fn new(next: OrderHeader, previous: OrderHeader) -> Self {
        Self {
            next,
            previous,
            written: None,
        }
    }
}

impl SagaStep for UpdateHeader {
    fn name(&self) -> &'static str {
        "update order header"
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Persisting
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        let written = store.update_order(&self.next, ExpectedVersion::Exact(self.previous.version))?;
        self.written = Some(written);
        Ok(())
    }

    fn compensate(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        if let Some(written) = self.written.take() {
            if let Err(e) = store.update_order(&self.previous, ExpectedVersion::Exact(written.version)) {
                self.written = Some(written);
                return Err(e.into());
            }
        }
        Ok(())
    }
}

/// Version bump of an unchanged header, guarded by `header.version`.
///
/// Any concurrent header write in between makes this step fail, which
/// serializes deletes and updates of the same order.
pub struct ClaimHeader {
    stage: &'static str,
    header: OrderHeader,
}

impl ClaimHeader {
    /// First delete step: bumps the header read before the saga.
    pub fn claim(header: OrderHeader) -> Self {
        Self {
            stage: "claim order header",
            header,
        }
    }

    /// Last update step: bumps the header written earlier in the saga.
    pub fn confirm(header: OrderHeader) -> Self {
        Self {
            stage: "confirm order header",
            header,
        }
    }
}

impl SagaStep for ClaimHeader {
    fn name(&self) -> &'static str {
        self.stage
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Persisting
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        store.update_order(&self.header, ExpectedVersion::Exact(self.header.version))?;
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ReplaceProgress {
    Untouched,
    Cleared,
    Replaced,
}

/// Swap an order's line items for a new set.
pub struct ReplaceLineItems {
    order_id: SalesOrderId,
    previous: Vec<LineItem>,
    next: Vec<LineItem>,
    progress: ReplaceProgress,
}

impl ReplaceLineItems {
    pub fn new(order_id: SalesOrderId, previous: Vec<LineItem>, next: Vec<LineItem>) -> Self {
        Self {
            order_id,
            previous,
            next,
            progress: ReplaceProgress::Untouched,
        }
    }
}

impl SagaStep for ReplaceLineItems {
    fn name(&self) -> &'static str {
        "replace line items"
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Persisting
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        store.delete_line_items(self.order_id)?;
        self.progress = ReplaceProgress::Cleared;
        store.insert_line_items(self.order_id, &self.next)?;
        self.progress = ReplaceProgress::Replaced;
        Ok(())
    }

    fn compensate(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        if self.progress == ReplaceProgress::Replaced {
            store.delete_line_items(self.order_id)?;
            self.progress = ReplaceProgress::Cleared;
        }
        if self.progress == ReplaceProgress::Cleared {
            store.insert_line_items(self.order_id, &self.previous)?;
            self.progress = ReplaceProgress::Untouched;
        }
        Ok(())
    }
}

pub struct DeleteLineItems {
    order_id: SalesOrderId,
    previous: Vec<LineItem>,
    deleted: bool,
}

impl DeleteLineItems {
    pub fn new(order_id: SalesOrderId, previous: Vec<LineItem>) -> Self {
        Self {
            order_id,
            previous,
            deleted: false,
        }
    }
}

impl SagaStep for DeleteLineItems {
    fn name(&self) -> &'static str {
        "delete line items"
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Persisting
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        store.delete_line_items(self.order_id)?;
        self.deleted = true;
        Ok(())
    }

    fn compensate(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        if self.deleted {
            store.insert_line_items(self.order_id, &self.previous)?;
            self.deleted = false;
        }
        Ok(())
    }
}

/// Final delete step; a failed delete leaves nothing to undo.
pub struct DeleteHeader {
    order_id: SalesOrderId,
    expected: ExpectedVersion,
}

impl DeleteHeader {
    pub fn new(order_id: SalesOrderId, expected: ExpectedVersion) -> Self {
        Self { order_id, expected }
    }
}

impl SagaStep for DeleteHeader {
    fn name(&self) -> &'static str {
        "delete order header"
    }

    fn phase(&self) -> SagaPhase {
        SagaPhase::Persisting
    }

    fn execute(&mut self, store: &dyn SalesStore) -> Result<(), SalesError> {
        store.delete_order(self.order_id, self.expected)?;
        Ok(())
    }
}
