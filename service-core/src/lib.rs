//! service-core: Shared infrastructure for the enrichment services.
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod observability;

pub use async_trait;
pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
