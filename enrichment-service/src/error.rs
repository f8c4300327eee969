//! Error types for the enrichment pipeline.
//!
//! Only [`PipelineError`] ever leaves `fetch_all_data`. Per-subscriber failures
//! are [`StepError`]s and are absorbed by the row assembler.

use service_core::error::AppError;
use service_core::http::Retryable;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single logical call to the billing API.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by upstream (HTTP {0})")]
    RateLimited(u16),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream returned a body that is not JSON ({reason}): {raw}")]
    InvalidBody { reason: String, raw: String },
}

impl TransportError {
    /// Build the error matching a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 {
            TransportError::RateLimited(status)
        } else {
            TransportError::Status { status, body }
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout(_) => "timeout",
            TransportError::Network(_) => "network",
            TransportError::RateLimited(_) => "rate_limited",
            TransportError::Status { status, .. } if *status >= 500 => "server_error",
            TransportError::Status { .. } => "client_error",
            TransportError::InvalidBody { .. } => "invalid_body",
        }
    }
}

impl Retryable for TransportError {
    fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout(_)
            | TransportError::Network(_)
            | TransportError::RateLimited(_) => true,
            TransportError::Status { status, .. } => *status >= 500,
            TransportError::InvalidBody { .. } => false,
        }
    }
}

/// Failure to total a subscriber's usage over the requested period.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("reseller cost overflowed after {windows} windows")]
    CostOverflow { windows: usize },
}

/// A per-subscriber enrichment step that failed and was degraded to absent data.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("package lookup failed: {0}")]
    Package(#[source] TransportError),

    #[error("usage aggregation failed: {0}")]
    Usage(#[source] UsageError),
}

impl StepError {
    pub fn step(&self) -> &'static str {
        match self {
            StepError::Package(_) => "package",
            StepError::Usage(_) => "usage",
        }
    }
}

/// Failures that abort a whole `fetch_all_data` call.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to list subscribers for account {account_id}: {source}")]
    Listing {
        account_id: i64,
        #[source]
        source: TransportError,
    },
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            PipelineError::Config(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            other @ PipelineError::Listing { .. } => AppError::InternalError(other.into()),
        }
    }
}
