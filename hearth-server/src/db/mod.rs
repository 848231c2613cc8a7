//! Database layer - connection pool, schema and repositories
//!
//! - One `PgPool` shared through `AppState`
//! - Every query is scoped by organization
//! - Multi-row writes run in a single transaction
//! - Unique constraints decide conflicts; no check-then-insert

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, create_pool_with_options};
pub use repos::*;
