//! Order listing read model.
//!
//! Mutations never patch the cached listing; they invalidate it and the next
//! read re-fetches the full listing from the store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use stockline_core::ClientId;
use stockline_sales::{OrderListing, SalesOrder};

use crate::store::{SalesStore, StoreError};

#[derive(Debug, Default)]
struct CacheState {
    listing: Option<Arc<Vec<OrderListing>>>,
    /// Bumped on every invalidation; a fetch started before an
    /// invalidation is returned but not cached.
    generation: u64,
}

#[derive(Debug, Default)]
pub struct OrderListCache {
    state: RwLock<CacheState>,
}

impl OrderListCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        if let Ok(mut state) = self.state.write() {
            state.listing = None;
            state.generation += 1;
        }
    }

    pub fn is_stale(&self) -> bool {
        self.state
            .read()
            .map(|state| state.listing.is_none())
            .unwrap_or(true)
    }

    pub fn get_or_refresh<S>(&self, store: &S) -> Result<Arc<Vec<OrderListing>>, StoreError>
    where
        S: SalesStore + ?Sized,
    {
        let generation = {
            let state = self
                .state
                .read()
                .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
            if let Some(listing) = &state.listing {
                return Ok(listing.clone());
            }
            state.generation
        };

        let listing = Arc::new(fetch_listing(store)?);
        debug!(orders = listing.len(), "order listing refreshed");

        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        if state.generation == generation {
            state.listing = Some(listing.clone());
        }
        Ok(listing)
    }
}

/// Full listing: headers newest-first, each joined with its line items and
/// client name.
pub fn fetch_listing<S>(store: &S) -> Result<Vec<OrderListing>, StoreError>
where
    S: SalesStore + ?Sized,
{
    let mut client_names: HashMap<ClientId, Option<String>> = HashMap::new();

    store
        .list_orders()?
        .into_iter()
        .map(|header| -> Result<OrderListing, StoreError> {
            let client_name = match header.client_id {
                Some(client_id) => match client_names.get(&client_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = store.get_client(client_id)?.map(|c| c.name);
                        client_names.insert(client_id, name.clone());
                        name
                    }
                },
                None => None,
            };
            let items = store.list_line_items(header.id)?;
            Ok(OrderListing {
                order: SalesOrder::from_parts(header, items),
                client_name,
            })
        })
        .collect()
}
