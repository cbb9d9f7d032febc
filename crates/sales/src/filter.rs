//! Order listing filter/sort engine.
//!
//! Pure and synchronous: runs over an already-fetched listing, never touches
//! the store.

use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockline_core::DomainError;

use crate::line_item::ItemCategory;
use crate::order::{MonthYear, OrderListing};

/// Line item kind filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindFilter {
    #[default]
    All,
    #[serde(alias = "produto")]
    Product,
    #[serde(alias = "servico")]
    Service,
}

impl KindFilter {
    fn accepts(self, listing: &OrderListing) -> bool {
        let wanted = match self {
            KindFilter::All => return true,
            KindFilter::Product => ItemCategory::Product,
            KindFilter::Service => ItemCategory::Service,
        };
        listing.order.items().iter().any(|item| item.category() == wanted)
    }
}

impl FromStr for KindFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(KindFilter::All),
            "product" | "produto" => Ok(KindFilter::Product),
            "service" | "servico" => Ok(KindFilter::Service),
            other => Err(DomainError::validation(format!("unknown kind filter: {other}"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    #[serde(alias = "data")]
    Date,
    #[serde(alias = "cliente")]
    Client,
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "data" => Ok(SortField::Date),
            "client" | "cliente" => Ok(SortField::Client),
            other => Err(DomainError::validation(format!("unknown sort field: {other}"))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Listing query. Defaults: no text, no month, all kinds, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderQuery {
    pub text: String,
    pub month_year: Option<MonthYear>,
    pub kind: KindFilter,
    pub sort_field: SortField,
    pub direction: SortDirection,
}

impl OrderQuery {
    /// Clicking the active column flips direction; another column starts descending.
    pub fn toggle_sort(&mut self, field: SortField) {
        if self.sort_field == field {
            self.direction = self.direction.flipped();
        } else {
            self.sort_field = field;
            self.direction = SortDirection::Desc;
        }
    }

    pub fn matches(&self, listing: &OrderListing) -> bool {
        self.matches_text(listing) && self.matches_month_year(listing) && self.kind.accepts(listing)
    }

    fn matches_text(&self, listing: &OrderListing) -> bool {
        let needle = self.text.to_lowercase();
        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

        listing.client_name.as_deref().is_some_and(|name| contains(name))
            || contains(listing.order.code())
            || listing.order.items().iter().any(|item| contains(&item.name))
    }

    fn matches_month_year(&self, listing: &OrderListing) -> bool {
        match self.month_year {
            None => true,
            Some(wanted) => listing.order.order_date().month_year() == Some(wanted),
        }
    }

    fn compare(&self, a: &OrderListing, b: &OrderListing) -> Ordering {
        let ordering = match self.sort_field {
            // `None` (unparseable) orders before any valid timestamp.
            SortField::Date => a
                .order
                .order_date()
                .timestamp()
                .cmp(&b.order.order_date().timestamp()),
            SortField::Client => a
                .client_name
                .as_deref()
                .unwrap_or("")
                .cmp(b.client_name.as_deref().unwrap_or("")),
        };
        self.direction.apply(ordering)
    }
}

/// Filter `orders` by `query` and sort the survivors.
///
/// The sort is stable: orders that compare equal keep their input order in
/// both directions.
pub fn filter_and_sort<'a>(orders: &'a [OrderListing], query: &OrderQuery) -> Vec<&'a OrderListing> {
    let mut selected: Vec<&OrderListing> = orders.iter().filter(|o| query.matches(o)).collect();
    selected.sort_by(|a, b| query.compare(a, b));
    selected
}
