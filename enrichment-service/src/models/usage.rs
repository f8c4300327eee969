//! Usage windows and their totals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A half-open `[start, end)` slice of the aggregation period, no longer than
/// the upstream's per-request span limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Bytes and reseller cost summed over every window of the period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageTotals {
    pub total_bytes: u64,
    pub total_cost: Decimal,
    pub windows: usize,
}

impl UsageTotals {
    /// Fold one window into the totals. Returns `None`, leaving the totals
    /// untouched, when the cost sum overflows.
    pub fn add(&mut self, bytes: u64, cost: Decimal) -> Option<()> {
        self.total_cost = self.total_cost.checked_add(cost)?;
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        self.windows += 1;
        Some(())
    }
}
