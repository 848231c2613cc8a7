//! hearth-server: HTTP API over the universal (EAV) schema
//!
//! Organizations partition everything. Entities are typed by a free-text
//! `entity_type`; their attributes live in `core_dynamic_data`. Purchase
//! orders are `universal_transactions` rows with lines.

pub mod db;
pub mod http;
pub mod models;
pub mod services;

pub use http::{build_router, run_server, AppState, ServerConfig};
