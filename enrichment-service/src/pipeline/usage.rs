//! Usage aggregation over periods longer than one upstream request may cover.

use super::mapper::map_bounded;
use super::shape::{coerce_bytes, extract, pick_bytes, pick_decimal};
use crate::client::BillingApi;
use crate::client::verbs;
use crate::error::UsageError;
use crate::models::{EntityId, UsageTotals, UsageWindow};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;

const USAGE_TOTAL_PATHS: &[&str] = &[
    "/subscriberUsageOverPeriod/total",
    "/total",
    "/subscriberUsageOverPeriod/usage",
];

/// Split `[start, end)` into consecutive windows of at most `max_span`, the
/// last one clipped to `end`. An empty or inverted range has no windows.
pub fn split_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span: TimeDelta,
) -> Vec<UsageWindow> {
    if max_span <= TimeDelta::zero() {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = cursor
            .checked_add_signed(max_span)
            .map_or(end, |next| next.min(end));
        windows.push(UsageWindow {
            start: cursor,
            end: next,
        });
        cursor = next;
    }
    windows
}

/// Data bytes and reseller cost of one window's total. Missing or unparsable
/// values count as zero.
pub fn read_window(response: &Value, type_code: &str) -> (u64, Decimal) {
    let Some(total) = extract(response, USAGE_TOTAL_PATHS) else {
        return (0, Decimal::ZERO);
    };

    let per_type = format!("/quantityPerType/{type_code}");
    let bytes = pick_bytes(total, &[per_type.as_str()])
        .or_else(|| bytes_from_type_list(total, type_code))
        .or_else(|| pick_bytes(total, &["/dataBytes", "/bytes"]))
        .unwrap_or(0);

    let cost_per_type = format!("/resellerCostPerType/{type_code}");
    let cost = pick_decimal(total, &["/resellerCost", cost_per_type.as_str(), "/cost"])
        .unwrap_or(Decimal::ZERO);

    (bytes, cost)
}

/// `usagePerType: [{type: 33, quantity: N}, ...]`
fn bytes_from_type_list(total: &Value, type_code: &str) -> Option<u64> {
    total
        .get("usagePerType")?
        .as_array()?
        .iter()
        .find(|entry| match entry.get("type") {
            Some(Value::String(s)) => s.trim() == type_code,
            Some(Value::Number(n)) => n.to_string() == type_code,
            _ => false,
        })
        .and_then(|entry| entry.get("quantity"))
        .and_then(coerce_bytes)
}

pub struct UsageAggregator {
    api: Arc<dyn BillingApi>,
    concurrency: usize,
    max_span: TimeDelta,
    data_usage_type: String,
}

impl UsageAggregator {
    pub fn new(
        api: Arc<dyn BillingApi>,
        concurrency: usize,
        max_span: TimeDelta,
        data_usage_type: impl Into<String>,
    ) -> Self {
        Self {
            api,
            concurrency,
            max_span,
            data_usage_type: data_usage_type.into(),
        }
    }

    /// Sum data bytes and reseller cost over `[start, end)`, one request per
    /// window with bounded concurrency. Fails if any window fails, so a total is
    /// never silently short.
    pub async fn aggregate_usage(
        &self,
        subscriber_id: &EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<UsageTotals, UsageError> {
        let windows = split_windows(start, end, self.max_span);
        let code = self.data_usage_type.as_str();

        let results = map_bounded(windows, self.concurrency, |_, window| async move {
            self.api
                .call(verbs::subscriber_usage(subscriber_id, &window))
                .await
                .map(|response| read_window(&response, code))
        })
        .await;

        let mut totals = UsageTotals::default();
        for result in results {
            let (bytes, cost) = result?;
            totals.add(bytes, cost).ok_or(UsageError::CostOverflow {
                windows: totals.windows,
            })?;
        }

        tracing::debug!(
            subscriber_id = %subscriber_id,
            windows = totals.windows,
            total_bytes = totals.total_bytes,
            total_cost = %totals.total_cost,
            "Usage aggregated"
        );
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockBillingApi;
    use crate::error::TransportError;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn twenty_days_is_three_contiguous_windows() {
        let windows = split_windows(at(1), at(21), TimeDelta::days(7));
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].start, at(1));
        assert_eq!(windows[0].end, at(8));
        assert_eq!(windows[1].start, at(8));
        assert_eq!(windows[2].start, at(15));
        assert_eq!(windows[2].end, at(21));
        assert!(windows.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn empty_and_inverted_ranges_have_no_windows() {
        assert!(split_windows(at(5), at(5), TimeDelta::days(7)).is_empty());
        assert!(split_windows(at(9), at(2), TimeDelta::days(7)).is_empty());
    }

    #[test]
    fn reads_each_known_usage_shape() {
        let per_type = json!({"subscriberUsageOverPeriod": {"total": {
            "quantityPerType": {"33": 1000},
            "resellerCost": "0.25"
        }}});
        assert_eq!(read_window(&per_type, "33"), (1000, dec!(0.25)));

        let list = json!({"total": {
            "usagePerType": [{"type": 10, "quantity": 5}, {"type": "33", "quantity": "700"}],
            "resellerCostPerType": {"33": 1.5}
        }});
        assert_eq!(read_window(&list, "33"), (700, dec!(1.5)));

        let flat = json!({"subscriberUsageOverPeriod": {"usage": {"bytes": 42, "cost": 2}}});
        assert_eq!(read_window(&flat, "33"), (42, dec!(2)));

        assert_eq!(read_window(&json!({}), "33"), (0, Decimal::ZERO));
    }

    #[tokio::test]
    async fn sums_every_window() {
        let api = Arc::new(MockBillingApi::new().on(verbs::SUBSCRIBER_USAGE, |_| {
            Ok(json!({"total": {"quantityPerType": {"33": 100}, "resellerCost": 1.25}}))
        }));
        let aggregator = UsageAggregator::new(api.clone(), 2, TimeDelta::days(7), "33");

        let totals = aggregator
            .aggregate_usage(&EntityId::Number(1), at(1), at(21))
            .await
            .unwrap();
        assert_eq!(totals.windows, 3);
        assert_eq!(totals.total_bytes, 300);
        assert_eq!(totals.total_cost, dec!(3.75));
        assert_eq!(api.calls_for(verbs::SUBSCRIBER_USAGE), 3);
    }

    #[tokio::test]
    async fn one_failed_window_fails_the_aggregate() {
        let api = Arc::new(MockBillingApi::new().on(verbs::SUBSCRIBER_USAGE, |payload| {
            if verbs::args_of(payload)["period"]["start"] == "2024-01-08 00:00:00" {
                Err(TransportError::from_status(400, "bad period".into()))
            } else {
                Ok(json!({"total": {"bytes": 1}}))
            }
        }));
        let aggregator = UsageAggregator::new(api, 4, TimeDelta::days(7), "33");

        let result = aggregator
            .aggregate_usage(&EntityId::Number(1), at(1), at(21))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn inverted_range_is_zero_without_calls() {
        let api = Arc::new(MockBillingApi::new());
        let aggregator = UsageAggregator::new(api.clone(), 4, TimeDelta::days(7), "33");

        let totals = aggregator
            .aggregate_usage(&EntityId::Number(1), at(10), at(3))
            .await
            .unwrap();
        assert_eq!(totals, UsageTotals::default());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn overflowing_cost_fails_instead_of_panicking() {
        let api = Arc::new(MockBillingApi::new().on(verbs::SUBSCRIBER_USAGE, |_| {
            Ok(json!({"total": {"resellerCost": "79228162514264337593543950335"}}))
        }));
        let aggregator = UsageAggregator::new(api, 2, TimeDelta::days(7), "33");

        let result = aggregator
            .aggregate_usage(&EntityId::Number(1), at(1), at(15))
            .await;
        assert!(matches!(result, Err(UsageError::CostOverflow { windows: 1 })));
    }
}
