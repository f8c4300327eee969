//! Outbound HTTP plumbing shared by services that call third-party APIs.

pub mod rate_limit;
pub mod retry;

pub use rate_limit::{OutboundRateLimiter, acquire, create_outbound_rate_limiter};
pub use retry::{RetryConfig, Retryable, retry_http_call};
