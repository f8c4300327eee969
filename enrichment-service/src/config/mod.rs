//! Enrichment service configuration, read from the environment.

use secrecy::Secret;
use service_core::config::{Config as CoreConfig, env_clamped, require_env};
use service_core::error::AppError;
use service_core::http::RetryConfig;
use std::time::Duration;

/// How the API token is presented to the billing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// `?token=<token>` on the request URL.
    #[default]
    Query,
    /// `Authorization: Bearer <token>`.
    Bearer,
}

impl AuthMode {
    fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(AuthMode::Query),
            "bearer" => Ok(AuthMode::Bearer),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "BILLING_API_AUTH must be 'query' or 'bearer', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BillingApiConfig {
    pub base_url: String,
    pub token: Secret<String>,
    pub auth: AuthMode,
    /// Upper bound on one attempt, connect through body.
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub requests_per_second: u32,
}

impl BillingApiConfig {
    /// Config with the default transport policy for `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: Secret::new(token.into()),
            auth: AuthMode::default(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(300),
            requests_per_second: 20,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_backoff: self.initial_backoff,
            ..RetryConfig::default()
        }
    }
}

/// Ten years; also bounds `usage_window_days` well inside `TimeDelta`'s range.
const MAX_LOOKBACK_DAYS: i64 = 3_660;

/// Tuning knobs of the enrichment pipeline itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Subscribers enriched at once.
    pub subscriber_concurrency: usize,
    /// Usage windows fetched at once, per subscriber.
    pub usage_concurrency: usize,
    /// Longest span one usage request may cover.
    pub usage_window_days: i64,
    /// Default start of the usage range when the caller gives none.
    pub usage_lookback_days: i64,
    /// Largest number of usage windows one subscriber's range may split into.
    pub max_usage_windows: usize,
    /// Usage type code for data traffic.
    pub data_usage_type: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            subscriber_concurrency: 4,
            usage_concurrency: 4,
            usage_window_days: 7,
            usage_lookback_days: 28,
            max_usage_windows: 104,
            data_usage_type: "33".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub common: CoreConfig,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub billing_api: BillingApiConfig,
    pub pipeline: PipelineConfig,
}

impl EnrichmentConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = CoreConfig::load()?;

        let base_url = require_env("BILLING_API_URL")?;
        let token = require_env("BILLING_API_TOKEN")?;
        let auth = match std::env::var("BILLING_API_AUTH") {
            Ok(raw) if !raw.trim().is_empty() => AuthMode::parse(&raw)?,
            _ => AuthMode::default(),
        };

        let defaults = BillingApiConfig::new(base_url, token);
        let billing_api = BillingApiConfig {
            auth,
            timeout: Duration::from_secs(env_clamped(
                "BILLING_API_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
                1,
                300,
            )?),
            max_retries: env_clamped("BILLING_API_MAX_RETRIES", defaults.max_retries, 0, 10)?,
            initial_backoff: Duration::from_millis(env_clamped(
                "BILLING_API_INITIAL_BACKOFF_MS",
                defaults.initial_backoff.as_millis() as u64,
                0,
                60_000,
            )?),
            requests_per_second: env_clamped(
                "BILLING_API_REQUESTS_PER_SECOND",
                defaults.requests_per_second,
                1,
                10_000,
            )?,
            ..defaults
        };

        let fallback = PipelineConfig::default();
        let pipeline = PipelineConfig {
            subscriber_concurrency: env_clamped(
                "SUBSCRIBER_CONCURRENCY",
                fallback.subscriber_concurrency,
                1,
                64,
            )?,
            usage_concurrency: env_clamped("USAGE_CONCURRENCY", fallback.usage_concurrency, 1, 64)?,
            usage_window_days: env_clamped("USAGE_WINDOW_DAYS", fallback.usage_window_days, 1, 31)?,
            usage_lookback_days: env_clamped(
                "USAGE_LOOKBACK_DAYS",
                fallback.usage_lookback_days,
                0,
                MAX_LOOKBACK_DAYS,
            )?,
            max_usage_windows: env_clamped(
                "MAX_USAGE_WINDOWS",
                fallback.max_usage_windows,
                1,
                1_000,
            )?,
            data_usage_type: std::env::var("DATA_USAGE_TYPE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(fallback.data_usage_type),
        };

        Ok(Self {
            common,
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "enrichment-service".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: std::env::var("OTLP_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            billing_api,
            pipeline,
        })
    }
}
