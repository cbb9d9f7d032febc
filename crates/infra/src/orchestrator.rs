//! Sales order orchestrator.
//!
//! Every mutation is a saga over the store's primitive operations:
//!
//! - create: verify, insert header, insert line items, subtract stock
//! - update: return old stock, verify, overwrite header, replace line items,
//!   subtract new stock, confirm header
//! - delete: claim header, return stock, delete line items, delete header
//!
//! Header writes are compare-and-swap on the version read before the saga,
//! so an update and a delete of the same order cannot both commit.
//!
//! The order listing is invalidated after every mutation attempt.

use std::sync::Arc;

use tracing::{error, info, instrument};

use stockline_core::{ExpectedVersion, SalesOrderId};
use stockline_sales::{
    OrderHeader, OrderListing, OrderQuery, OrderSummary, SalesOrder, SalesOrderDraft,
    filter_and_sort,
};

use crate::code_generator::{GeneratedCode, OrderCodeGenerator};
use crate::config::SalesConfig;
use crate::error::{OrderOperation, SalesError};
use crate::order_cache::OrderListCache;
use crate::saga::{
    AdjustStock, ClaimHeader, DeleteHeader, DeleteLineItems, InsertHeader, InsertLineItems,
    ReplaceLineItems, Saga, UpdateHeader, VerifyStock,
};
use crate::store::SalesStore;

pub struct SalesOrderService<S> {
    store: S,
    config: SalesConfig,
    codes: OrderCodeGenerator,
    cache: OrderListCache,
}

impl<S> SalesOrderService<S>
where
    S: SalesStore,
{
    pub fn new(store: S, config: SalesConfig) -> Self {
        let codes = OrderCodeGenerator::new(config.code_format());
        Self {
            store,
            config,
            codes,
            cache: OrderListCache::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SalesConfig {
        &self.config
    }

    /// Suggested code for a new order.
    pub fn generate_code(&self) -> GeneratedCode {
        self.codes.generate(&self.store)
    }

    #[instrument(skip_all, fields(items = draft.items.len()))]
    pub fn create_order(&self, draft: SalesOrderDraft) -> Result<SalesOrder, SalesError> {
        let result = self.try_create(draft);
        observe(OrderOperation::Create, &result);
        result
    }

    #[instrument(skip_all, fields(order_id = %id, items = draft.items.len()))]
    pub fn update_order(
        &self,
        id: SalesOrderId,
        draft: SalesOrderDraft,
    ) -> Result<SalesOrder, SalesError> {
        let result = self.try_update(id, draft);
        observe(OrderOperation::Update, &result);
        result
    }

    #[instrument(skip_all, fields(order_id = %id))]
    pub fn delete_order(&self, id: SalesOrderId) -> Result<(), SalesError> {
        let result = self.try_delete(id);
        observe(OrderOperation::Delete, &result);
        result
    }

    /// Stored order with its line items.
    pub fn get_order(&self, id: SalesOrderId) -> Result<SalesOrder, SalesError> {
        let header = self.load_header(id)?;
        let items = self.store.list_line_items(id)?;
        Ok(SalesOrder::from_parts(header, items))
    }

    /// Full listing, newest first, served from the cache when fresh.
    pub fn list_orders(&self) -> Result<Arc<Vec<OrderListing>>, SalesError> {
        Ok(self.cache.get_or_refresh(&self.store)?)
    }

    pub fn list_filtered(&self, query: &OrderQuery) -> Result<Vec<OrderListing>, SalesError> {
        let listing = self.list_orders()?;
        Ok(filter_and_sort(&listing, query).into_iter().cloned().collect())
    }

    /// Totals over the listing rows matching `query`.
    pub fn summary(&self, query: &OrderQuery) -> Result<OrderSummary, SalesError> {
        let listing = self.list_orders()?;
        Ok(OrderSummary::from_orders(filter_and_sort(&listing, query)))
    }

    fn try_create(&self, draft: SalesOrderDraft) -> Result<SalesOrder, SalesError> {
        validate_draft(&draft)?;

        let code = match explicit_code(&draft) {
            Some(code) => code,
            None => self.generate_code().into_code(),
        };
        let order = SalesOrder::from_draft(SalesOrderId::new(), code, draft);
        let attempts = self.config.stock_write_attempts;

        let outcome = Saga::new(OrderOperation::Create, order.id_typed())
            .step(VerifyStock::new(order.items().to_vec()))
            .step(InsertHeader::new(order.header()))
            .step(InsertLineItems::new(order.id_typed(), order.items().to_vec()))
            .step(AdjustStock::subtract(order.items().to_vec(), attempts))
            .run(&self.store);
        self.cache.invalidate();
        outcome?;

        info!(order_id = %order.id_typed(), code = order.code(), total = order.total(), "order created");
        Ok(order)
    }

    fn try_update(&self, id: SalesOrderId, draft: SalesOrderDraft) -> Result<SalesOrder, SalesError> {
        validate_draft(&draft)?;

        let previous = self.load_header(id)?;
        let previous_items = self.store.list_line_items(id)?;

        let code = explicit_code(&draft).unwrap_or_else(|| previous.code.clone());
        let order = SalesOrder::from_draft(id, code, draft);
        let next = order.header();
        let written = OrderHeader {
            version: previous.version + 1,
            ..next.clone()
        };
        let attempts = self.config.stock_write_attempts;

        let outcome = Saga::new(OrderOperation::Update, id)
            .step(AdjustStock::restore(previous_items.clone(), attempts))
            .step(VerifyStock::new(order.items().to_vec()))
            .step(UpdateHeader::new(next, previous))
            .step(ReplaceLineItems::new(id, previous_items, order.items().to_vec()))
            .step(AdjustStock::subtract(order.items().to_vec(), attempts))
            .step(ClaimHeader::confirm(written.clone()))
            .run(&self.store);
        self.cache.invalidate();
        outcome?;

        info!(order_id = %id, code = order.code(), total = order.total(), "order updated");
        let stored = OrderHeader {
            version: written.version + 1,
            ..written
        };
        Ok(SalesOrder::from_parts(stored, order.items().to_vec()))
    }

    fn try_delete(&self, id: SalesOrderId) -> Result<(), SalesError> {
        let previous = self.load_header(id)?;
        let previous_items = self.store.list_line_items(id)?;
        let attempts = self.config.stock_write_attempts;

        let claimed = ExpectedVersion::Exact(previous.version + 1);

        let outcome = Saga::new(OrderOperation::Delete, id)
            .step(ClaimHeader::claim(previous.clone()))
            .step(AdjustStock::restore(previous_items.clone(), attempts))
            .step(DeleteLineItems::new(id, previous_items))
            .step(DeleteHeader::new(id, claimed))
            .run(&self.store);
        self.cache.invalidate();
        outcome?;

        info!(order_id = %id, code = previous.code.as_str(), "order deleted");
        Ok(())
    }

    fn load_header(&self, id: SalesOrderId) -> Result<OrderHeader, SalesError> {
        self.store.get_order(id)?.ok_or(SalesError::OrderNotFound(id))
    }
}

fn validate_draft(draft: &SalesOrderDraft) -> Result<(), SalesError> {
    if draft.items.is_empty() {
        return Err(SalesError::EmptyOrder);
    }
    draft.validate_items()?;
    Ok(())
}

fn explicit_code(draft: &SalesOrderDraft) -> Option<String> {
    draft
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

fn observe<T>(operation: OrderOperation, result: &Result<T, SalesError>) {
    match result {
        Ok(_) => {}
        Err(e) if e.is_user_facing() => info!(%operation, error = %e, "order rejected"),
        Err(e) if e.requires_reconciliation() => {
            error!(%operation, error = %e, "stock reconciliation required")
        }
        Err(e) => error!(%operation, error = %e, "order operation failed"),
    }
}
