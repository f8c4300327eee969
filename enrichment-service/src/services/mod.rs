//! Services module for enrichment-service.

pub mod metrics;

pub use metrics::{get_metrics, init_metrics};
