//! Dynamic data (EAV attribute) repository
//!
//! One row per (entity, field). Writes are upserts on that pair.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use super::DbError;
use crate::models::{FieldName, FieldValue};

const FIELD_COLUMNS: &str = "entity_id, field_name, field_type, field_value_text, \
                             field_value_number, field_value_boolean, field_value_json, updated_at";

/// A stored attribute of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicField {
    pub entity_id: Uuid,
    pub field_name: String,
    pub value: FieldValue,
    pub updated_at: DateTime<Utc>,
}

impl DynamicField {
    fn from_row(row: &PgRow) -> Result<Self, DbError> {
        let field_name: String = row.try_get("field_name")?;
        let field_type: String = row.try_get("field_type")?;

        let value = FieldValue::from_columns(
            &field_type,
            row.try_get("field_value_text")?,
            row.try_get("field_value_number")?,
            row.try_get("field_value_boolean")?,
            row.try_get("field_value_json")?,
        )
        .ok_or_else(|| {
            DbError::InvalidReference(format!(
                "field '{}' has type '{}' but no matching value",
                field_name, field_type
            ))
        })?;

        Ok(Self {
            entity_id: row.try_get("entity_id")?,
            field_name,
            value,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Insert or replace one field on an open connection.
///
/// The entity must already belong to `organization_id`; callers check.
pub(crate) async fn upsert_field(
    conn: &mut PgConnection,
    organization_id: Uuid,
    entity_id: Uuid,
    name: &FieldName,
    value: &FieldValue,
) -> Result<DynamicField, DbError> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO core_dynamic_data
            (organization_id, entity_id, field_name, field_type,
             field_value_text, field_value_number, field_value_boolean, field_value_json)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (entity_id, field_name) DO UPDATE SET
            field_type = EXCLUDED.field_type,
            field_value_text = EXCLUDED.field_value_text,
            field_value_number = EXCLUDED.field_value_number,
            field_value_boolean = EXCLUDED.field_value_boolean,
            field_value_json = EXCLUDED.field_value_json,
            updated_at = NOW()
        RETURNING {FIELD_COLUMNS}
        "#
    ))
    .bind(organization_id)
    .bind(entity_id)
    .bind(name.as_str())
    .bind(value.field_type())
    .bind(value.as_text())
    .bind(value.as_number())
    .bind(value.as_boolean())
    .bind(value.as_json())
    .fetch_one(&mut *conn)
    .await?;

    DynamicField::from_row(&row)
}

/// Fields of several entities in one query, ordered by entity then name.
pub(crate) async fn fields_for_entities(
    conn: &mut PgConnection,
    entity_ids: &[Uuid],
) -> Result<Vec<DynamicField>, DbError> {
    if entity_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(&format!(
        "SELECT {FIELD_COLUMNS} FROM core_dynamic_data \
         WHERE entity_id = ANY($1) ORDER BY entity_id, field_name"
    ))
    .bind(entity_ids)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(DynamicField::from_row).collect()
}

/// Dynamic data repository
pub struct DynamicDataRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DynamicDataRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Set a field on an active entity of the organization.
    pub async fn upsert(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
        name: &FieldName,
        value: &FieldValue,
    ) -> Result<DynamicField, DbError> {
        let mut tx = self.pool.begin().await?;
        super::entities::ensure_entity(&mut tx, organization_id, entity_id).await?;
        let field = upsert_field(&mut tx, organization_id, entity_id, name, value).await?;
        tx.commit().await?;
        Ok(field)
    }

    /// All fields of one entity.
    pub async fn list_for_entity(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
    ) -> Result<Vec<DynamicField>, DbError> {
        let mut conn = self.pool.acquire().await?;
        super::entities::ensure_entity(&mut conn, organization_id, entity_id).await?;
        fields_for_entities(&mut conn, &[entity_id]).await
    }

    /// Remove a field of an active entity. Missing fields are NotFound.
    pub async fn delete(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
        name: &FieldName,
    ) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        super::entities::ensure_entity(&mut conn, organization_id, entity_id).await?;

        let result = sqlx::query(
            "DELETE FROM core_dynamic_data \
             WHERE organization_id = $1 AND entity_id = $2 AND field_name = $3",
        )
        .bind(organization_id)
        .bind(entity_id)
        .bind(name.as_str())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("field", name.as_str()));
        }
        Ok(())
    }

    /// Text value of one field of an active entity of a given type.
    ///
    /// Used to read a user's `role` during purchase order approval.
    pub async fn text_field(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
        entity_type: &str,
        field_name: &str,
    ) -> Result<Option<String>, DbError> {
        let row: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            SELECT d.field_value_text
            FROM core_entities e
            LEFT JOIN core_dynamic_data d
                ON d.entity_id = e.id AND d.field_name = $4
            WHERE e.id = $2 AND e.organization_id = $1
              AND e.entity_type = $3 AND e.is_active
            "#,
        )
        .bind(organization_id)
        .bind(entity_id)
        .bind(entity_type)
        .bind(field_name)
        .fetch_optional(self.pool)
        .await?;

        match row {
            None => Err(DbError::not_found(
                if entity_type == "user" { "user" } else { "entity" },
                entity_id,
            )),
            Some((value,)) => Ok(value),
        }
    }
}
