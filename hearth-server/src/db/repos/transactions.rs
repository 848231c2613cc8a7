//! Transaction repository (purchase orders)
//!
//! A purchase order is a `universal_transactions` header with
//! `transaction_type = 'purchase_order'` and numbered lines. Status writes
//! are compare-and-set on the status the caller read, so two approvers
//! racing on one order cannot both win.

use chrono::{DateTime, Utc};
use hearth_core::{transaction_code, PoStatus};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::entities::ensure_entity;
use super::organizations::ensure_active;
use super::{conflict_on_unique, DbError};
use crate::models::{OrderLines, Paginated, Pagination};

/// `transaction_type` of purchase orders
pub const PURCHASE_ORDER: &str = "purchase_order";

/// Attempts before giving up on a free transaction code
const CODE_ATTEMPTS: usize = 3;

const TX_COLUMNS: &str = "id, organization_id, transaction_type, transaction_code, \
                          reference_entity_id, status, total_amount_cents, notes, \
                          approved_by, approved_at, created_at, updated_at";

/// Transaction header
#[derive(Debug, Clone, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub transaction_type: String,
    pub transaction_code: String,
    /// Supplier entity for purchase orders
    pub reference_entity_id: Option<Uuid>,
    pub status: String,
    pub total_amount_cents: i64,
    pub notes: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Parsed status; unknown strings are reported as a reference error
    pub fn po_status(&self) -> Result<PoStatus, DbError> {
        self.status.parse().map_err(|_| {
            DbError::InvalidReference(format!(
                "transaction '{}' has unknown status '{}'",
                self.id, self.status
            ))
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionLine {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub line_number: i32,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
    pub line_amount_cents: i64,
}

#[derive(Debug, Clone)]
pub struct TransactionWithLines {
    pub transaction: Transaction,
    pub lines: Vec<TransactionLine>,
}

/// Validated purchase order input
#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub organization_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
    pub lines: OrderLines,
}

#[derive(Debug, Clone)]
pub struct PurchaseOrderFilter {
    pub organization_id: Uuid,
    pub status: Option<PoStatus>,
}

/// Count and value of orders in one status
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StatusSummary {
    pub status: String,
    pub count: i64,
    pub total_amount_cents: i64,
}

pub struct TransactionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TransactionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert header and lines atomically. Status starts `pending_approval`.
    pub async fn create_purchase_order(
        &self,
        new: &NewPurchaseOrder,
        code_prefix: &str,
    ) -> Result<TransactionWithLines, DbError> {
        let mut tx = self.pool.begin().await?;
        ensure_active(&mut tx, new.organization_id).await?;

        let referenced = new.supplier_id.into_iter().chain(new.lines.entity_ids());
        for entity_id in referenced {
            ensure_entity(&mut tx, new.organization_id, entity_id)
                .await
                .map_err(|e| match e {
                    DbError::NotFound { id, .. } => DbError::InvalidReference(format!(
                        "entity '{}' is not an active entity of this organization",
                        id
                    )),
                    other => other,
                })?;
        }

        let mut header = None;
        for attempt in 1..=CODE_ATTEMPTS {
            let code = transaction_code(code_prefix, Utc::now().date_naive(), &mut rand::thread_rng());

            let inserted: Option<Transaction> = sqlx::query_as(&format!(
                r#"
                INSERT INTO universal_transactions
                    (organization_id, transaction_type, transaction_code,
                     reference_entity_id, status, total_amount_cents, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (transaction_code) DO NOTHING
                RETURNING {TX_COLUMNS}
                "#
            ))
            .bind(new.organization_id)
            .bind(PURCHASE_ORDER)
            .bind(&code)
            .bind(new.supplier_id)
            .bind(PoStatus::PendingApproval.as_str())
            .bind(new.lines.total_cents())
            .bind(new.notes.as_deref())
            .fetch_optional(&mut *tx)
            .await?;

            if inserted.is_some() {
                header = inserted;
                break;
            }
            tracing::debug!(%code, attempt, "transaction code collision, retrying");
        }

        let header = header.ok_or_else(|| {
            DbError::Conflict("could not generate a unique purchase order code".to_string())
        })?;

        let mut lines = Vec::with_capacity(new.lines.len());
        for line in new.lines.iter() {
            let row: TransactionLine = sqlx::query_as(
                r#"
                INSERT INTO universal_transaction_lines
                    (transaction_id, line_number, entity_id, description,
                     quantity, unit_price_cents, line_amount_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING id, transaction_id, line_number, entity_id, description,
                          quantity, unit_price_cents, line_amount_cents
                "#,
            )
            .bind(header.id)
            .bind(line.line_number)
            .bind(line.entity_id)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.line_amount_cents)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, || format!("duplicate line {}", line.line_number)))?;
            lines.push(row);
        }

        tx.commit().await?;

        tracing::info!(
            id = %header.id,
            code = %header.transaction_code,
            total_cents = header.total_amount_cents,
            lines = lines.len(),
            "purchase order created"
        );
        Ok(TransactionWithLines {
            transaction: header,
            lines,
        })
    }

    /// Purchase orders of one organization, newest first.
    pub async fn list(
        &self,
        filter: &PurchaseOrderFilter,
        page: Pagination,
    ) -> Result<Paginated<Transaction>, DbError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TX_COLUMNS}, COUNT(*) OVER() AS total
            FROM universal_transactions
            WHERE organization_id = $1 AND transaction_type = $2
              AND ($3::text IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.organization_id)
        .bind(PURCHASE_ORDER)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Transaction::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    /// Header of a purchase order of the organization.
    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<Transaction, DbError> {
        sqlx::query_as(&format!(
            "SELECT {TX_COLUMNS} FROM universal_transactions \
             WHERE id = $1 AND organization_id = $2 AND transaction_type = $3"
        ))
        .bind(id)
        .bind(organization_id)
        .bind(PURCHASE_ORDER)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("purchase order", id))
    }

    /// Header plus lines in line order.
    pub async fn get_with_lines(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<TransactionWithLines, DbError> {
        let transaction = self.get(organization_id, id).await?;

        let lines = sqlx::query_as(
            r#"
            SELECT id, transaction_id, line_number, entity_id, description,
                   quantity, unit_price_cents, line_amount_cents
            FROM universal_transaction_lines
            WHERE transaction_id = $1
            ORDER BY line_number
            "#,
        )
        .bind(transaction.id)
        .fetch_all(self.pool)
        .await?;

        Ok(TransactionWithLines { transaction, lines })
    }

    /// Write a new status if the order is still in `expected`.
    ///
    /// `approved_by`/`approved_at` record the final decision only, so they
    /// are left alone on escalation. `note` is appended to `notes`.
    pub async fn set_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        expected: PoStatus,
        next: PoStatus,
        actor_id: Uuid,
        note: Option<&str>,
    ) -> Result<Transaction, DbError> {
        let decided_by = next.is_final().then_some(actor_id);

        let updated: Option<Transaction> = sqlx::query_as(&format!(
            r#"
            UPDATE universal_transactions SET
                status = $4,
                approved_by = COALESCE($5, approved_by),
                approved_at = CASE WHEN $5::uuid IS NULL THEN approved_at ELSE NOW() END,
                notes = CASE
                    WHEN $6::text IS NULL THEN notes
                    WHEN notes IS NULL OR notes = '' THEN $6
                    ELSE notes || E'\n' || $6
                END,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
              AND transaction_type = '{PURCHASE_ORDER}' AND status = $3
            RETURNING {TX_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(organization_id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(decided_by)
        .bind(note)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(tx) => {
                tracing::info!(
                    %id,
                    from = %expected,
                    to = %next,
                    actor = %actor_id,
                    "purchase order status changed"
                );
                Ok(tx)
            }
            None => {
                // Either gone or changed underneath us
                let current = self.get(organization_id, id).await?;
                Err(DbError::Conflict(format!(
                    "purchase order is now {}",
                    current.status
                )))
            }
        }
    }

    /// Order count and value per status for one organization.
    pub async fn status_summary(&self, organization_id: Uuid) -> Result<Vec<StatusSummary>, DbError> {
        let rows = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) AS count,
                   COALESCE(SUM(total_amount_cents), 0)::BIGINT AS total_amount_cents
            FROM universal_transactions
            WHERE organization_id = $1 AND transaction_type = $2
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(organization_id)
        .bind(PURCHASE_ORDER)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(status: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            transaction_type: PURCHASE_ORDER.into(),
            transaction_code: "PO-20260118-AB12".into(),
            reference_entity_id: None,
            status: status.into(),
            total_amount_cents: 0,
            notes: None,
            approved_by: None,
            approved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_stored_status() {
        assert_eq!(header("escalated").po_status().unwrap(), PoStatus::Escalated);
        assert!(matches!(
            header("shipped").po_status(),
            Err(DbError::InvalidReference(_))
        ));
    }
}
