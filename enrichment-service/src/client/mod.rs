//! Billing API transport.
//!
//! The upstream exposes a single endpoint taking `{"<verb>": {...args}}`
//! bodies. [`BillingApi`] is the seam the pipeline talks through; the
//! production implementation is [`HttpBillingClient`].

pub mod http;
pub mod mock;
pub mod verbs;

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;

pub use http::HttpBillingClient;
pub use mock::MockBillingApi;

/// One logical request/response exchange with the billing service.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Send `payload` and return the parsed JSON body.
    ///
    /// Implementations own timeouts and retries; an `Err` here is final.
    async fn call(&self, payload: Value) -> Result<Value, TransportError>;
}
