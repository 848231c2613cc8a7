//! Command implementations for the hearth CLI

pub mod bulk_upload;
pub mod config;
pub mod migrate;
pub mod org;
pub mod serve;
pub mod template;

pub use bulk_upload::{run_bulk_upload, BulkUploadArgs};
pub use config::{run_config, ConfigArgs};
pub use migrate::{run_migrate, MigrateArgs};
pub use org::{run_org, OrgArgs};
pub use serve::{run_serve, ServeArgs};
pub use template::{run_template, TemplateArgs};
