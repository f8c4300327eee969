//! Subscriber enrichment pipeline.
//!
//! `fetch_all_data` lists an account's subscribers and turns each one into a
//! [`Row`]: latest package, template cost (cached), and optionally usage
//! totals. Only configuration problems and a failed listing fail the call;
//! everything that goes wrong for one subscriber just leaves fields of that
//! subscriber's row empty.

pub mod cost;
pub mod mapper;
pub mod package;
pub mod shape;
pub mod usage;

pub use cost::{CostCandidate, CostResolver, ResolvedCost, TemplateCache};
pub use mapper::map_bounded;
pub use package::PackageResolver;
pub use usage::{UsageAggregator, split_windows};

use crate::client::BillingApi;
use crate::client::verbs;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, StepError};
use crate::models::{Page, Row, Subscriber};
use crate::services::metrics::{record_pipeline_run, record_rows};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Deserialize;
use shape::extract_list;
use std::sync::Arc;
use std::time::Instant;

const SUBSCRIBER_LIST_PATHS: &[&str] = &[
    "/listSubscriber/subscriberList",
    "/subscriberList",
    "/listSubscriber/subscribers",
];

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;
pub const MAX_CURSOR: usize = 1_000_000;

/// Caller options for one `fetch_all_data` call. Deserializes from the
/// camelCase query string of the HTTP shell.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    pub limit: Option<i64>,
    pub cursor: Option<i64>,
    #[serde(default)]
    pub include_usage: bool,
    /// `YYYY-MM-DD` or RFC 3339.
    pub usage_from: Option<String>,
    /// `YYYY-MM-DD` (inclusive) or RFC 3339; defaults to now.
    pub usage_to: Option<String>,
}

impl FetchOptions {
    pub fn page_size(&self) -> usize {
        self.limit
            .map(|l| l.clamp(1, MAX_LIMIT as i64) as usize)
            .unwrap_or(DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> usize {
        self.cursor
            .map(|c| c.clamp(0, MAX_CURSOR as i64) as usize)
            .unwrap_or(0)
    }
}

/// Half-open usage period `[start, end)`.
pub type UsageRange = (DateTime<Utc>, DateTime<Utc>);

pub struct EnrichmentPipeline {
    api: Arc<dyn BillingApi>,
    packages: PackageResolver,
    costs: CostResolver,
    usage: UsageAggregator,
    config: PipelineConfig,
}

impl EnrichmentPipeline {
    pub fn new(api: Arc<dyn BillingApi>, config: PipelineConfig) -> Self {
        Self::with_cache(api, config, TemplateCache::new())
    }

    /// Build a pipeline around an existing template cache.
    pub fn with_cache(
        api: Arc<dyn BillingApi>,
        config: PipelineConfig,
        cache: TemplateCache,
    ) -> Self {
        Self {
            packages: PackageResolver::new(api.clone()),
            costs: CostResolver::new(api.clone(), cache),
            usage: UsageAggregator::new(
                api.clone(),
                config.usage_concurrency,
                TimeDelta::days(config.usage_window_days),
                config.data_usage_type.clone(),
            ),
            api,
            config,
        }
    }

    pub fn template_cache(&self) -> &TemplateCache {
        self.costs.cache()
    }

    /// Enrich one page of an account's subscribers.
    #[tracing::instrument(
        skip(self, options),
        fields(
            limit = tracing::field::Empty,
            cursor = tracing::field::Empty,
            include_usage = options.include_usage
        )
    )]
    pub async fn fetch_all_data(
        &self,
        account_id: i64,
        options: FetchOptions,
    ) -> Result<Page, PipelineError> {
        let started = Instant::now();
        let result = self.run(account_id, &options).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        record_pipeline_run(outcome, started.elapsed().as_secs_f64());
        result
    }

    async fn run(&self, account_id: i64, options: &FetchOptions) -> Result<Page, PipelineError> {
        if account_id <= 0 {
            return Err(PipelineError::InvalidRequest(format!(
                "accountId must be a positive integer, got {account_id}"
            )));
        }

        let limit = options.page_size();
        let cursor = options.offset();
        let span = tracing::Span::current();
        span.record("limit", limit as u64);
        span.record("cursor", cursor as u64);

        let range = self.usage_range(options, Utc::now())?;
        let usage_range = options.include_usage.then_some(range);

        let response = self
            .api
            .call(verbs::list_subscriber(account_id))
            .await
            .map_err(|source| {
                tracing::error!(account_id, error = %source, "Subscriber listing failed");
                PipelineError::Listing { account_id, source }
            })?;

        let listed = extract_list(&response, SUBSCRIBER_LIST_PATHS);
        let total = listed.len();
        let subscribers: Vec<Subscriber> = listed
            .iter()
            .skip(cursor)
            .take(limit)
            .map(Subscriber::from_value)
            .collect();
        let next_cursor = (cursor + limit < total).then_some(cursor + limit);

        let rows = map_bounded(
            subscribers,
            self.config.subscriber_concurrency,
            |_, subscriber| async move { self.assemble_row(&subscriber, usage_range).await },
        )
        .await;

        let complete = rows
            .iter()
            .filter(|row| row.is_complete(usage_range.is_some()))
            .count();
        record_rows(complete, rows.len() - complete);

        tracing::info!(
            account_id,
            listed = total,
            rows = rows.len(),
            complete,
            next_cursor = ?next_cursor,
            "Account rows enriched"
        );

        Ok(Page { rows, next_cursor })
    }

    /// Enrich one subscriber. Never fails: each step that errors leaves its
    /// fields empty and the rest of the row is still filled in.
    pub async fn assemble_row(&self, subscriber: &Subscriber, usage_range: Option<UsageRange>) -> Row {
        let mut row = Row::from_subscriber(subscriber);
        let subscriber_id = subscriber.subscriber_id.as_ref();

        let package = match subscriber_id {
            Some(id) => match self.packages.resolve_latest_package(id).await {
                Ok(package) => package,
                Err(e) => {
                    log_degraded(&row, &StepError::Package(e));
                    None
                }
            },
            None => {
                tracing::warn!(iccid = ?row.iccid, "Listed subscriber has no id; package and usage skipped");
                None
            }
        };
        if let Some(package) = &package {
            row.apply_package(package);
        }

        if let Some(template_id) = row.template_id.clone() {
            let resolved = self.costs.resolve_cost(&template_id).await;
            row.one_time_cost = resolved.cost;
            if row.template_name.is_none() {
                row.template_name = resolved.name;
            }
        }

        // The template price wins; the package's own fee only fills a gap.
        if row.one_time_cost.is_none_or(|cost| cost.is_zero())
            && let Some(fee) = package.as_ref().and_then(|p| p.one_time_fee)
        {
            row.one_time_cost = Some(fee);
        }

        if let (Some(id), Some((start, end))) = (subscriber_id, usage_range) {
            match self.usage.aggregate_usage(id, start, end).await {
                Ok(totals) => row.apply_usage(&totals),
                Err(e) => log_degraded(&row, &StepError::Usage(e)),
            }
        }

        row
    }

    /// The usage period requested by `options`, relative to `now`. Ranges that
    /// would need more than `max_usage_windows` requests are rejected.
    fn usage_range(&self, options: &FetchOptions, now: DateTime<Utc>) -> Result<UsageRange, PipelineError> {
        let end = match non_blank(&options.usage_to) {
            Some(raw) => parse_bound(raw, "usageTo", true)?,
            None => now,
        };
        let start = match non_blank(&options.usage_from) {
            Some(raw) => parse_bound(raw, "usageFrom", false)?,
            None => end
                .checked_sub_signed(TimeDelta::days(self.config.usage_lookback_days))
                .ok_or_else(|| {
                    PipelineError::InvalidRequest("usageTo is too early for the default lookback".into())
                })?,
        };

        let span = TimeDelta::days(self.config.usage_window_days).num_seconds().max(1) as u64;
        let seconds = (end - start).num_seconds().max(0) as u64;
        let windows = seconds.div_ceil(span);
        let max = self.config.max_usage_windows as u64;
        if windows > max {
            return Err(PipelineError::InvalidRequest(format!(
                "usage range needs {windows} windows of {} days; at most {max} are allowed",
                self.config.usage_window_days
            )));
        }
        Ok((start, end))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a `YYYY-MM-DD` or RFC 3339 bound. A bare date used as the end of the
/// range includes that whole day.
fn parse_bound(raw: &str, field: &str, is_end: bool) -> Result<DateTime<Utc>, PipelineError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let day = if is_end { date.succ_opt() } else { Some(date) };
        if let Some(midnight) = day.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            PipelineError::InvalidRequest(format!(
                "{field} must be a YYYY-MM-DD date, got '{raw}'"
            ))
        })
}

fn log_degraded(row: &Row, err: &StepError) {
    tracing::warn!(
        subscriber_id = ?row.subscriber_id,
        step = err.step(),
        error = %err,
        "Enrichment step failed; row degraded"
    );
}
