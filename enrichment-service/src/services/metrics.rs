//! Prometheus metrics for the enrichment service.

use prometheus::{
    Encoder, HistogramVec, IntCounterVec, TextEncoder, histogram_opts, opts,
    register_histogram_vec, register_int_counter_vec,
};
use std::sync::{Once, OnceLock};

/// Billing API calls by verb and final outcome (after retries).
pub static UPSTREAM_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billing API call duration including retries and backoff.
pub static UPSTREAM_REQUEST_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Retried billing API attempts by verb.
pub static UPSTREAM_RETRIES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Template cost lookups by cache result.
pub static TEMPLATE_CACHE_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Rows produced, by completeness.
pub static ROWS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Whole `fetch_all_data` runs.
pub static PIPELINE_DURATION: OnceLock<HistogramVec> = OnceLock::new();

static INIT: Once = Once::new();

fn install<T>(slot: &OnceLock<T>, name: &str, metric: prometheus::Result<T>) {
    match metric {
        Ok(metric) => {
            let _ = slot.set(metric);
        }
        Err(e) => tracing::warn!(metric = name, error = %e, "Failed to register metric"),
    }
}

/// Register all metrics with the default registry. Safe to call repeatedly.
pub fn init_metrics() {
    INIT.call_once(|| {
        install(
            &UPSTREAM_REQUESTS_TOTAL,
            "enrichment_upstream_requests_total",
            register_int_counter_vec!(
                opts!(
                    "enrichment_upstream_requests_total",
                    "Billing API calls by verb and outcome"
                ),
                &["verb", "outcome"]
            ),
        );

        install(
            &UPSTREAM_REQUEST_DURATION,
            "enrichment_upstream_request_duration_seconds",
            register_histogram_vec!(
                histogram_opts!(
                    "enrichment_upstream_request_duration_seconds",
                    "Billing API call duration including retries",
                    vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
                ),
                &["verb"]
            ),
        );

        install(
            &UPSTREAM_RETRIES_TOTAL,
            "enrichment_upstream_retries_total",
            register_int_counter_vec!(
                opts!(
                    "enrichment_upstream_retries_total",
                    "Retried billing API attempts by verb"
                ),
                &["verb"]
            ),
        );

        install(
            &TEMPLATE_CACHE_TOTAL,
            "enrichment_template_cache_total",
            register_int_counter_vec!(
                opts!(
                    "enrichment_template_cache_total",
                    "Template cost lookups by cache result"
                ),
                &["result"]
            ),
        );

        install(
            &ROWS_TOTAL,
            "enrichment_rows_total",
            register_int_counter_vec!(
                opts!("enrichment_rows_total", "Rows produced by completeness"),
                &["completeness"]
            ),
        );

        install(
            &PIPELINE_DURATION,
            "enrichment_pipeline_duration_seconds",
            register_histogram_vec!(
                histogram_opts!(
                    "enrichment_pipeline_duration_seconds",
                    "fetch_all_data duration",
                    vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
                ),
                &["outcome"]
            ),
        );
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_upstream_request(verb: &str, outcome: &str, duration_secs: f64) {
    if let Some(counter) = UPSTREAM_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[verb, outcome]).inc();
    }
    if let Some(histogram) = UPSTREAM_REQUEST_DURATION.get() {
        histogram.with_label_values(&[verb]).observe(duration_secs);
    }
}

pub fn record_upstream_retry(verb: &str) {
    if let Some(counter) = UPSTREAM_RETRIES_TOTAL.get() {
        counter.with_label_values(&[verb]).inc();
    }
}

/// `result` is `hit` or `miss`.
pub fn record_template_cache(result: &str) {
    if let Some(counter) = TEMPLATE_CACHE_TOTAL.get() {
        counter.with_label_values(&[result]).inc();
    }
}

pub fn record_rows(complete: usize, partial: usize) {
    if let Some(counter) = ROWS_TOTAL.get() {
        counter
            .with_label_values(&["complete"])
            .inc_by(complete as u64);
        counter.with_label_values(&["partial"]).inc_by(partial as u64);
    }
}

pub fn record_pipeline_run(outcome: &str, duration_secs: f64) {
    if let Some(histogram) = PIPELINE_DURATION.get() {
        histogram.with_label_values(&[outcome]).observe(duration_secs);
    }
}
