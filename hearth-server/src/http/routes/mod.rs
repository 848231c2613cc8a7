//! Route handlers organized by resource

pub mod health;
pub mod organizations;
pub mod dashboard;
pub mod entities;
pub mod relationships;
pub mod users;
pub mod purchasing;
pub mod bulk_upload;
pub mod templates;
