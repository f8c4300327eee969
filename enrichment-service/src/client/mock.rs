//! Scripted in-memory billing API for tests and local runs.

use super::BillingApi;
use super::verbs::verb_of;
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type Responder = Box<dyn Fn(&Value) -> Result<Value, TransportError> + Send + Sync>;

/// Billing API double answering each verb with a scripted closure and
/// recording every payload it receives.
#[derive(Default)]
pub struct MockBillingApi {
    responders: HashMap<String, Responder>,
    latency: Option<Duration>,
    calls: Mutex<Vec<Value>>,
}

impl MockBillingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `verb` with `respond(payload)`.
    pub fn on<F>(mut self, verb: &str, respond: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.responders.insert(verb.to_string(), Box::new(respond));
        self
    }

    /// Sleep this long before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every payload received so far, in arrival order.
    pub fn calls(&self) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn calls_for(&self, verb: &str) -> usize {
        self.calls().iter().filter(|p| verb_of(p) == verb).count()
    }
}

#[async_trait]
impl BillingApi for MockBillingApi {
    async fn call(&self, payload: Value) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(payload.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.responders.get(verb_of(&payload)) {
            Some(respond) => respond(&payload),
            None => Err(TransportError::Status {
                status: 404,
                body: format!("no mock response for verb {}", verb_of(&payload)),
            }),
        }
    }
}
