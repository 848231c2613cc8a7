//! Bulk upload records and reports
//!
//! A batch is parsed record by record: a malformed record becomes an entry
//! in the report instead of failing the whole batch. Only batch-level
//! problems (empty, too large) are errors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What a bulk upload creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkKind {
    Entities,
    Users,
}

impl BulkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entities => "entities",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for BulkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkKind {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entities" => Ok(Self::Entities),
            "users" => Ok(Self::Users),
            other => Err(BulkError::UnknownKind(other.to_string())),
        }
    }
}

/// Generic entity row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityRecord {
    pub entity_type: String,
    pub entity_name: String,
    #[serde(default)]
    pub entity_code: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// User row (stored as a `user` entity)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "staff".to_string()
}

/// One parsed record of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BulkRecord {
    Entity(EntityRecord),
    User(UserRecord),
}

/// Batch-level failures
#[derive(Debug, Error, PartialEq)]
pub enum BulkError {
    #[error("unknown bulk upload kind '{0}' (entities, users)")]
    UnknownKind(String),

    #[error("batch contains no records")]
    Empty,

    #[error("batch has {count} records, limit is {max}")]
    TooMany { count: usize, max: usize },
}

/// Failure of a single record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordError {
    pub index: usize,
    pub message: String,
}

/// Outcome of a bulk upload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BulkReport {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
    pub errors: Vec<RecordError>,
}

impl BulkReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record_created(&mut self) {
        self.created += 1;
    }

    pub fn record_failure(&mut self, index: usize, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(RecordError {
            index,
            message: message.into(),
        });
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.created == self.total
    }
}

/// Parse raw JSON records for `kind`, enforcing the batch limit.
///
/// Returns one entry per input record; malformed records carry the serde
/// message.
pub fn parse_records(
    kind: BulkKind,
    records: Vec<Value>,
    max_records: usize,
) -> Result<Vec<Result<BulkRecord, String>>, BulkError> {
    if records.is_empty() {
        return Err(BulkError::Empty);
    }
    if records.len() > max_records {
        return Err(BulkError::TooMany {
            count: records.len(),
            max: max_records,
        });
    }

    let parsed = records
        .into_iter()
        .map(|value| match kind {
            BulkKind::Entities => serde_json::from_value::<EntityRecord>(value)
                .map(BulkRecord::Entity)
                .map_err(|e| e.to_string()),
            BulkKind::Users => serde_json::from_value::<UserRecord>(value)
                .map(BulkRecord::User)
                .map_err(|e| e.to_string()),
        })
        .collect();

    Ok(parsed)
}
