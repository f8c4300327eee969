//! Data model for the enrichment pipeline.

mod entity_id;
mod package;
mod row;
mod subscriber;
mod usage;

pub use entity_id::EntityId;
pub use package::Package;
pub use row::{Page, Row};
pub use subscriber::Subscriber;
pub use usage::{UsageTotals, UsageWindow};
