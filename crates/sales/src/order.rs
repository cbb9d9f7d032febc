use core::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use stockline_core::{AggregateRoot, ClientId, DomainError, DomainResult, SalesOrderId};

use crate::line_item::LineItem;

/// Order date as it lives in the store.
///
/// Dates come from forms and imports, so they are kept verbatim and parsed on
/// demand. All interpretation happens in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderDate(String);

impl OrderDate {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed instant, if the stored value is a recognised date format.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(dt.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    pub fn month_year(&self) -> Option<MonthYear> {
        self.timestamp().map(|ts| MonthYear {
            month: ts.month(),
            year: ts.year(),
        })
    }
}

impl From<NaiveDate> for OrderDate {
    fn from(value: NaiveDate) -> Self {
        Self(value.format("%Y-%m-%d").to_string())
    }
}

impl From<DateTime<Utc>> for OrderDate {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.to_rfc3339())
    }
}

/// Calendar bucket `MM/YYYY` used by the listing filters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthYear {
    year: i32,
    month: u32,
}

impl MonthYear {
    pub fn new(month: u32, year: i32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!("month out of range: {month}")));
        }
        Ok(Self { year, month })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl core::fmt::Display for MonthYear {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

impl FromStr for MonthYear {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("expected MM/YYYY, got {s:?}"));
        let (month, year) = s.trim().split_once('/').ok_or_else(invalid)?;
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if month.len() != 2 || year.len() != 4 || !all_digits(month) || !all_digits(year) {
            return Err(invalid());
        }
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        Self::new(month, year)
    }
}

impl TryFrom<String> for MonthYear {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthYear> for String {
    fn from(value: MonthYear) -> Self {
        value.to_string()
    }
}

/// Persisted order header (the `sales_orders` record).
///
/// `total` is written by the orchestrator together with the line items it was
/// computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHeader {
    pub id: SalesOrderId,
    pub code: String,
    pub client_id: Option<ClientId>,
    pub order_date: OrderDate,
    pub total: u64,
    pub version: u64,
}

/// Caller-supplied content for a create or a full replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrderDraft {
    /// Explicit code; when absent the generated code is used.
    pub code: Option<String>,
    pub client_id: Option<ClientId>,
    pub order_date: OrderDate,
    pub items: Vec<LineItem>,
}

impl SalesOrderDraft {
    pub fn new(order_date: impl Into<OrderDate>, items: Vec<LineItem>) -> Self {
        Self {
            code: None,
            client_id: None,
            order_date: order_date.into(),
            items,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Per-line validation plus order-level overflow checks. Emptiness is
    /// checked separately by the caller.
    pub fn validate_items(&self) -> DomainResult<()> {
        self.items.iter().try_for_each(LineItem::validate)?;
        sum_checked(&self.items, LineItem::checked_total, "order total overflow")?;
        sum_checked(&self.items, LineItem::checked_cost, "order cost overflow")?;
        Ok(())
    }

    pub fn total(&self) -> u64 {
        sum_saturating(&self.items, LineItem::total)
    }
}

/// Aggregate root: SalesOrder (header + its full line item set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    id: SalesOrderId,
    code: String,
    client_id: Option<ClientId>,
    order_date: OrderDate,
    items: Vec<LineItem>,
    version: u64,
}

impl SalesOrder {
    /// New, not yet persisted order built from a draft.
    pub fn from_draft(id: SalesOrderId, code: impl Into<String>, draft: SalesOrderDraft) -> Self {
        Self {
            id,
            code: code.into(),
            client_id: draft.client_id,
            order_date: draft.order_date,
            items: draft.items,
            version: 0,
        }
    }

    /// Rehydrate from the two stored collections.
    pub fn from_parts(header: OrderHeader, items: Vec<LineItem>) -> Self {
        Self {
            id: header.id,
            code: header.code,
            client_id: header.client_id,
            order_date: header.order_date,
            items,
            version: header.version,
        }
    }

    pub fn id_typed(&self) -> SalesOrderId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn order_date(&self) -> &OrderDate {
        &self.order_date
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Sum of line totals, recomputed on every call.
    pub fn total(&self) -> u64 {
        sum_saturating(&self.items, LineItem::total)
    }

    pub fn cost(&self) -> u64 {
        sum_saturating(&self.items, LineItem::cost)
    }

    /// Header record carrying the total of the current line items.
    pub fn header(&self) -> OrderHeader {
        OrderHeader {
            id: self.id,
            code: self.code.clone(),
            client_id: self.client_id,
            order_date: self.order_date.clone(),
            total: self.total(),
            version: self.version,
        }
    }
}

impl AggregateRoot for SalesOrder {
    type Id = SalesOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn sum_checked(
    items: &[LineItem],
    amount: fn(&LineItem) -> DomainResult<u64>,
    overflow: &'static str,
) -> DomainResult<u64> {
    items.iter().try_fold(0u64, |acc, item| {
        acc.checked_add(amount(item)?)
            .ok_or_else(|| DomainError::invariant(overflow))
    })
}

fn sum_saturating(items: &[LineItem], amount: fn(&LineItem) -> u64) -> u64 {
    items.iter().fold(0u64, |acc, item| acc.saturating_add(amount(item)))
}

/// Listing row: an order enriched with its client's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderListing {
    pub order: SalesOrder,
    pub client_name: Option<String>,
}
