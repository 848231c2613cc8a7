//! Configuration for the server and CLI
//!
//! TOML at `$HEARTH_CONFIG` or ~/.hearth/config.toml, `${VAR}` expansion,
//! then `DATABASE_URL`/`HEARTH_BIND` overrides from the environment.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{HearthError, Result};

/// Matches `${NAME}` references expanded from the environment
static VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("invalid var regex"));

/// Centralized configuration for the hearth server and CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HearthConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub purchasing: PurchasingSection,

    #[serde(default)]
    pub bulk_upload: BulkUploadSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,

    /// Allow any origin. Localhost only when false.
    #[serde(default)]
    pub cors_permissive: bool,

    /// Extra allowed origins on top of the localhost defaults
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_permissive: false,
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    /// PostgreSQL connection string; `DATABASE_URL` wins when set
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Create the schema on server start
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchasingSection {
    /// Orders above this total need an owner to approve
    #[serde(default = "default_threshold")]
    pub approval_threshold_cents: i64,

    /// Prefix for generated purchase order codes
    #[serde(default = "default_po_prefix")]
    pub code_prefix: String,
}

impl Default for PurchasingSection {
    fn default() -> Self {
        Self {
            approval_threshold_cents: default_threshold(),
            code_prefix: default_po_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkUploadSection {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl Default for BulkUploadSection {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3030))
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> i64 {
    500_000
}

fn default_po_prefix() -> String {
    "PO".to_string()
}

fn default_max_records() -> usize {
    1000
}

impl HearthConfig {
    /// Load config from `$HEARTH_CONFIG` or ~/.hearth/config.toml.
    ///
    /// A missing file is not an error: defaults apply, then environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a specific file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let expanded = expand_env(&content);

        let config: Self = toml::from_str(&expanded).map_err(|source| HearthError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Config file path: `$HEARTH_CONFIG` or ~/.hearth/config.toml
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("HEARTH_CONFIG") {
            return PathBuf::from(path);
        }

        config_dir()
            .unwrap_or_else(|| PathBuf::from(".hearth"))
            .join("config.toml")
    }

    /// Apply `DATABASE_URL` and `HEARTH_BIND`
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = Some(url);
            }
        }

        if let Ok(bind) = env::var("HEARTH_BIND") {
            self.server.bind = bind
                .parse()
                .map_err(|_| HearthError::config(format!("HEARTH_BIND is not an address: {}", bind)))?;
        }

        Ok(())
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(HearthError::config("database.max_connections must be at least 1"));
        }
        if self.purchasing.approval_threshold_cents < 0 {
            return Err(HearthError::config(
                "purchasing.approval_threshold_cents cannot be negative",
            ));
        }
        if self.purchasing.code_prefix.trim().is_empty() {
            return Err(HearthError::config("purchasing.code_prefix cannot be empty"));
        }
        if self.bulk_upload.max_records == 0 {
            return Err(HearthError::config("bulk_upload.max_records must be at least 1"));
        }
        Ok(())
    }

    /// Database URL, or a config error naming where to set it
    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().ok_or_else(|| {
            HearthError::config("DATABASE_URL not set (env, .env, or [database].url in config.toml)")
        })
    }

    /// Write config as TOML, creating the parent directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| HearthError::config(format!("failed to serialize config: {}", e)))?;

        fs::write(path, toml_str)?;
        Ok(())
    }
}

/// Expand `${VAR}` references; unknown variables become empty strings
fn expand_env(s: &str) -> String {
    VAR_RE
        .replace_all(s, |caps: &regex::Captures<'_>| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// The hearth config directory (~/.hearth)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hearth"))
}

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Current directory .env
/// 2. ~/.hearth/.env
/// 3. Environment variables already set
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from {}", path.display());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            // dotenvy does not overwrite variables that are already set
            match dotenvy::from_path(&env_file) {
                Ok(()) => debug!("Loaded .env from {}", env_file.display()),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HearthConfig::default();
        assert_eq!(config.server.bind.port(), 3030);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.purchasing.approval_threshold_cents, 500_000);
        assert_eq!(config.bulk_upload.max_records, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: HearthConfig = toml::from_str(
            r#"
            [purchasing]
            approval_threshold_cents = 100000
            "#,
        )
        .unwrap();

        assert_eq!(config.purchasing.approval_threshold_cents, 100_000);
        assert_eq!(config.purchasing.code_prefix, "PO");
        assert_eq!(config.server.bind.port(), 3030);
    }

    #[test]
    fn expands_known_variables() {
        env::set_var("HEARTH_TEST_DB_HOST", "db.internal");
        let expanded = expand_env("url = \"postgres://${HEARTH_TEST_DB_HOST}/hearth\"");
        assert_eq!(expanded, "url = \"postgres://db.internal/hearth\"");
    }

    #[test]
    fn unknown_variables_expand_empty() {
        let expanded = expand_env("x${HEARTH_TEST_SURELY_UNSET_VAR}y");
        assert_eq!(expanded, "xy");
    }

    #[test]
    fn rejects_zero_bulk_limit() {
        let mut config = HearthConfig::default();
        config.bulk_upload.max_records = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_records"));
    }

    #[test]
    fn missing_database_url_is_config_error() {
        let config = HearthConfig::default();
        assert!(matches!(
            config.database_url(),
            Err(HearthError::Config { .. })
        ));
    }
}
