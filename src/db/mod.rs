//! Database provisioning and operational checks.

mod ops;
mod schema;

pub use ops::{create_name_indexes, scheduler_healthy};
pub use schema::create_tables;
