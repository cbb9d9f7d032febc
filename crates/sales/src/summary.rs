//! Aggregate figures over an order listing (sales panel totals).

use serde::{Deserialize, Serialize};

use crate::order::OrderListing;

/// Totals over a set of orders, usually the filtered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderSummary {
    pub count: usize,
    /// Sum of order totals (smallest currency unit).
    pub gross_total: u64,
    /// Sum of `unit_cost × quantity` over all lines.
    pub cost_total: u64,
    /// Gross minus cost; negative when selling below cost.
    pub net_total: i64,
    /// Gross divided by count, truncated; zero for an empty set.
    pub average_ticket: u64,
}

impl OrderSummary {
    pub fn from_orders<'a, I>(orders: I) -> Self
    where
        I: IntoIterator<Item = &'a OrderListing>,
    {
        let mut summary = Self::default();
        for listing in orders {
            summary.count += 1;
            summary.gross_total = summary.gross_total.saturating_add(listing.order.total());
            summary.cost_total = summary.cost_total.saturating_add(listing.order.cost());
        }

        let net = i128::from(summary.gross_total) - i128::from(summary.cost_total);
        summary.net_total = i64::try_from(net).unwrap_or(if net < 0 { i64::MIN } else { i64::MAX });
        if summary.count > 0 {
            summary.average_ticket = summary.gross_total / summary.count as u64;
        }
        summary
    }
}
