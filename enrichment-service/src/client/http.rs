//! reqwest-backed billing API client.

use super::BillingApi;
use super::verbs::verb_of;
use crate::config::{AuthMode, BillingApiConfig};
use crate::error::{PipelineError, TransportError};
use crate::services::metrics::{record_upstream_request, record_upstream_retry};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use service_core::http::{
    OutboundRateLimiter, RetryConfig, acquire, create_outbound_rate_limiter, retry_http_call,
};
use std::time::{Duration, Instant};

/// How much of an unexpected body is kept for diagnostics.
const MAX_DIAGNOSTIC_BODY_CHARS: usize = 2048;

/// Billing API client: timeout, client-side rate limiting, and retry of
/// transient failures around a single POST endpoint.
#[derive(Clone)]
pub struct HttpBillingClient {
    client: Client,
    config: BillingApiConfig,
    retry: RetryConfig,
    limiter: OutboundRateLimiter,
}

impl HttpBillingClient {
    pub fn new(config: BillingApiConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("enrichment-service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: config.retry_config(),
            limiter: create_outbound_rate_limiter(config.requests_per_second),
            config,
        })
    }

    /// Override the retry policy (tests use short backoffs).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// One attempt: no retry, but rate limited and bounded by the timeout.
    async fn send_once(&self, payload: &Value) -> Result<Value, TransportError> {
        acquire(&self.limiter).await;

        let token = self.config.token.expose_secret();
        let request = self.client.post(self.config.base_url.as_str()).json(payload);
        let request = match self.config.auth {
            AuthMode::Bearer => request.bearer_auth(token),
            AuthMode::Query => request.query(&[("token", token.as_str())]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| classify(e, self.config.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify(e, self.config.timeout))?;

        tracing::debug!(
            verb = verb_of(payload),
            status = %status,
            body_len = body.len(),
            "Billing API response"
        );

        if !status.is_success() {
            return Err(TransportError::from_status(
                status.as_u16(),
                truncate(&body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| TransportError::InvalidBody {
            reason: e.to_string(),
            raw: truncate(&body),
        })
    }
}

#[async_trait]
impl BillingApi for HttpBillingClient {
    async fn call(&self, payload: Value) -> Result<Value, TransportError> {
        let verb = verb_of(&payload).to_string();
        let started = Instant::now();

        let result = retry_http_call(&self.retry, &verb, |attempt| {
            if attempt > 0 {
                record_upstream_retry(&verb);
            }
            self.send_once(&payload)
        })
        .await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        record_upstream_request(&verb, outcome, started.elapsed().as_secs_f64());

        result
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(err.to_string())
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_DIAGNOSTIC_BODY_CHARS).collect()
}
