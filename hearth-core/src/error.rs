//! Structured error types for hearth-core.
//!
//! Library consumers get composable errors; the `hearth` binary wraps
//! them with `anyhow` context.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for hearth-core operations
#[derive(Error, Debug)]
pub enum HearthError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid config file {path:?}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Configuration value rejected
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Template definition is malformed
    #[error("Template '{key}' is invalid: {reason}")]
    Template { key: String, reason: String },

    /// Status change not permitted from the current status
    #[error("Cannot {action} a purchase order that is {from}")]
    InvalidTransition { from: String, action: &'static str },

    /// Input rejected by a business rule
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },
}

/// Result type alias for hearth-core operations
pub type Result<T> = std::result::Result<T, HearthError>;

impl HearthError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a template error
    pub fn template(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Template {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
