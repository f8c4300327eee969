pub mod health;
pub mod rows;

pub use health::{health_check, metrics_handler};
pub use rows::get_account_rows;
