//! Repository implementations for database access
//!
//! Each repository borrows the pool. Writes that touch several rows take a
//! transaction; the row-level helpers take `&mut PgConnection` so template
//! deployment can reuse them inside its own transaction.

pub mod organizations;
pub mod entities;
pub mod dynamic_data;
pub mod relationships;
pub mod metadata;
pub mod transactions;

pub use organizations::{Organization, OrganizationRepo, OrganizationUpdate};
pub use entities::{Entity, EntityFilter, EntityRepo, EntityUpdate, EntityWithFields, NewEntity};
pub use dynamic_data::{DynamicDataRepo, DynamicField};
pub use relationships::{NewRelationship, Relationship, RelationshipRepo};
pub use metadata::{MetadataEntry, MetadataRepo};
pub use transactions::{
    NewPurchaseOrder, PurchaseOrderFilter, StatusSummary, Transaction, TransactionLine,
    TransactionRepo, TransactionWithLines, PURCHASE_ORDER,
};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

impl DbError {
    /// The database could not be reached or the connection broke.
    ///
    /// Anything else (a constraint, a value Postgres refused) is about the
    /// statement, and the next statement may well succeed.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Sqlx(
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::Protocol(_)
                    | sqlx::Error::WorkerCrashed
            )
        )
    }
}

/// True when `err` is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

/// Map unique violations to `Conflict`, everything else to `Sqlx`
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: impl FnOnce() -> String) -> DbError {
    if is_unique_violation(&err) {
        DbError::Conflict(message())
    } else {
        DbError::Sqlx(err)
    }
}
