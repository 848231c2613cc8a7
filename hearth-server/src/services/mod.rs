//! Operations spanning several repositories

pub mod bulk_upload;
pub mod deploy;
pub mod inputs;

pub use deploy::{DeployError, Deployment, DeploymentPlan, TemplateDeployer};
