//! Entity repository
//!
//! Entities are rows tagged with a free-text `entity_type`; their attributes
//! are `core_dynamic_data` rows. Creation writes both in one transaction.
//! Lists fetch fields for the whole page in a second query (no N+1).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Row};
use uuid::Uuid;

use super::dynamic_data::{fields_for_entities, upsert_field, DynamicField};
use super::organizations::ensure_active;
use super::{conflict_on_unique, DbError};
use crate::models::{
    EntityCode, EntityName, EntityType, FieldName, FieldValue, Paginated, Pagination,
};

const ENTITY_COLUMNS: &str = "id, organization_id, entity_type, entity_name, entity_code, \
                              status, is_active, created_at, updated_at";

/// Entity record from database
#[derive(Debug, Clone, FromRow)]
pub struct Entity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub entity_type: String,
    pub entity_name: String,
    pub entity_code: Option<String>,
    pub status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entity with its dynamic fields
#[derive(Debug, Clone)]
pub struct EntityWithFields {
    pub entity: Entity,
    pub fields: Vec<DynamicField>,
}

/// Validated input for a new entity
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub entity_type: EntityType,
    pub name: EntityName,
    pub code: Option<EntityCode>,
    pub status: Option<String>,
    pub fields: Vec<(FieldName, FieldValue)>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct EntityUpdate {
    pub name: Option<EntityName>,
    pub code: Option<EntityCode>,
    pub status: Option<String>,
}

/// List filter
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub entity_type: Option<EntityType>,
    /// Case-insensitive substring of `entity_name` or `entity_code`
    pub search: Option<String>,
}

/// Fail with NotFound unless the entity is active and belongs to the org.
pub(crate) async fn ensure_entity(
    conn: &mut PgConnection,
    organization_id: Uuid,
    entity_id: Uuid,
) -> Result<(), DbError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM core_entities \
         WHERE id = $1 AND organization_id = $2 AND is_active)",
    )
    .bind(entity_id)
    .bind(organization_id)
    .fetch_one(&mut *conn)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(DbError::not_found("entity", entity_id))
    }
}

/// Insert an entity and its fields on an open connection.
pub(crate) async fn insert_entity(
    conn: &mut PgConnection,
    organization_id: Uuid,
    new: &NewEntity,
) -> Result<EntityWithFields, DbError> {
    let entity: Entity = sqlx::query_as(&format!(
        r#"
        INSERT INTO core_entities
            (organization_id, entity_type, entity_name, entity_code, status)
        VALUES ($1, $2, $3, $4, COALESCE($5, 'active'))
        RETURNING {ENTITY_COLUMNS}
        "#
    ))
    .bind(organization_id)
    .bind(new.entity_type.as_str())
    .bind(new.name.as_str())
    .bind(new.code.as_ref().map(EntityCode::as_str))
    .bind(new.status.as_deref())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        conflict_on_unique(e, || {
            format!(
                "{} with code '{}' already exists",
                new.entity_type.as_str(),
                new.code.as_ref().map(EntityCode::as_str).unwrap_or_default()
            )
        })
    })?;

    let mut fields = Vec::with_capacity(new.fields.len());
    for (name, value) in &new.fields {
        fields.push(upsert_field(conn, organization_id, entity.id, name, value).await?);
    }

    Ok(EntityWithFields { entity, fields })
}

/// Attach fields to entities, keeping entity order.
fn attach_fields(entities: Vec<Entity>, fields: Vec<DynamicField>) -> Vec<EntityWithFields> {
    let mut by_entity: HashMap<Uuid, Vec<DynamicField>> = HashMap::new();
    for field in fields {
        by_entity.entry(field.entity_id).or_default().push(field);
    }

    entities
        .into_iter()
        .map(|entity| {
            let fields = by_entity.remove(&entity.id).unwrap_or_default();
            EntityWithFields { entity, fields }
        })
        .collect()
}

/// Entity repository
pub struct EntityRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EntityRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an entity with its initial fields (atomic).
    pub async fn create(
        &self,
        organization_id: Uuid,
        new: &NewEntity,
    ) -> Result<EntityWithFields, DbError> {
        let mut tx = self.pool.begin().await?;
        ensure_active(&mut tx, organization_id).await?;
        let created = insert_entity(&mut tx, organization_id, new).await?;
        tx.commit().await?;

        tracing::debug!(
            id = %created.entity.id,
            entity_type = %created.entity.entity_type,
            fields = created.fields.len(),
            "entity created"
        );
        Ok(created)
    }

    /// List active entities of an organization with their fields.
    ///
    /// `search` matches a case-insensitive substring of the name or code.
    pub async fn list(
        &self,
        organization_id: Uuid,
        filter: &EntityFilter,
        page: Pagination,
    ) -> Result<Paginated<EntityWithFields>, DbError> {
        let mut conn = self.pool.acquire().await?;
        ensure_active(&mut conn, organization_id).await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ENTITY_COLUMNS}, COUNT(*) OVER() AS total
            FROM core_entities
            WHERE organization_id = $1 AND is_active
              AND ($2::text IS NULL OR entity_type = $2)
              AND ($3::text IS NULL
                   OR strpos(lower(entity_name), lower($3)) > 0
                   OR strpos(lower(coalesce(entity_code, '')), lower($3)) > 0)
            ORDER BY entity_type, entity_name
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(organization_id)
        .bind(filter.entity_type.as_ref().map(EntityType::as_str))
        .bind(filter.search.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&mut *conn)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let entities = rows
            .iter()
            .map(Entity::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<Uuid> = entities.iter().map(|e| e.id).collect();
        let fields = fields_for_entities(&mut conn, &ids).await?;

        Ok(page.wrap(attach_fields(entities, fields), total))
    }

    /// Get one active entity with its fields.
    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> Result<EntityWithFields, DbError> {
        let mut conn = self.pool.acquire().await?;

        let entity: Entity = sqlx::query_as(&format!(
            "SELECT {ENTITY_COLUMNS} FROM core_entities \
             WHERE id = $1 AND organization_id = $2 AND is_active"
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("entity", id))?;

        let fields = fields_for_entities(&mut conn, &[id]).await?;
        Ok(EntityWithFields { entity, fields })
    }

    /// Apply a partial update and return the entity with fields.
    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        update: &EntityUpdate,
    ) -> Result<EntityWithFields, DbError> {
        let updated: Option<Entity> = sqlx::query_as(&format!(
            r#"
            UPDATE core_entities SET
                entity_name = COALESCE($3, entity_name),
                entity_code = COALESCE($4, entity_code),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND is_active
            RETURNING {ENTITY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(organization_id)
        .bind(update.name.as_ref().map(EntityName::as_str))
        .bind(update.code.as_ref().map(EntityCode::as_str))
        .bind(update.status.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || "entity code already in use".to_string()))?;

        let entity = updated.ok_or_else(|| DbError::not_found("entity", id))?;
        let mut conn = self.pool.acquire().await?;
        let fields = fields_for_entities(&mut conn, &[id]).await?;
        Ok(EntityWithFields { entity, fields })
    }

    /// Soft delete. Relationships touching the entity are deactivated too.
    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE core_entities SET is_active = FALSE, status = 'inactive', updated_at = NOW() \
             WHERE id = $1 AND organization_id = $2 AND is_active",
        )
        .bind(id)
        .bind(organization_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("entity", id));
        }

        sqlx::query(
            "UPDATE core_relationships SET is_active = FALSE \
             WHERE organization_id = $1 AND (source_entity_id = $2 OR target_entity_id = $2)",
        )
        .bind(organization_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Active entity counts per type, for dashboards.
    pub async fn count_by_type(&self, organization_id: Uuid) -> Result<Vec<(String, i64)>, DbError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT entity_type, COUNT(*)
            FROM core_entities
            WHERE organization_id = $1 AND is_active
            GROUP BY entity_type
            ORDER BY entity_type
            "#,
        )
        .bind(organization_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
