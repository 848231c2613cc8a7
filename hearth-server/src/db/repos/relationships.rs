//! Relationship repository
//!
//! Directed, typed links between two entities of the same organization.
//! Creating an existing link reactivates it instead of failing.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::entities::ensure_entity;
use super::DbError;
use crate::models::RelationshipType;

const RELATIONSHIP_COLUMNS: &str = "id, organization_id, source_entity_id, target_entity_id, \
                                    relationship_type, metadata, is_active, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct Relationship {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub source_entity_id: Uuid,
    pub target_entity_id: Uuid,
    pub relationship_type: String,
    pub metadata: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub source_entity_id: Uuid,
    pub target_entity_id: Uuid,
    pub relationship_type: RelationshipType,
    pub metadata: serde_json::Value,
}

/// Insert (or reactivate) a relationship on an open connection.
///
/// Both endpoints must be active entities of `organization_id`.
pub(crate) async fn insert_relationship(
    conn: &mut PgConnection,
    organization_id: Uuid,
    new: &NewRelationship,
) -> Result<Relationship, DbError> {
    if new.source_entity_id == new.target_entity_id {
        return Err(DbError::InvalidReference(
            "an entity cannot relate to itself".to_string(),
        ));
    }

    for end in [new.source_entity_id, new.target_entity_id] {
        ensure_entity(conn, organization_id, end)
            .await
            .map_err(|e| match e {
                DbError::NotFound { id, .. } => DbError::InvalidReference(format!(
                    "entity '{}' is not an active entity of this organization",
                    id
                )),
                other => other,
            })?;
    }

    let rel = sqlx::query_as(&format!(
        r#"
        INSERT INTO core_relationships
            (organization_id, source_entity_id, target_entity_id, relationship_type, metadata)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (source_entity_id, target_entity_id, relationship_type) DO UPDATE SET
            is_active = TRUE,
            metadata = EXCLUDED.metadata
        RETURNING {RELATIONSHIP_COLUMNS}
        "#
    ))
    .bind(organization_id)
    .bind(new.source_entity_id)
    .bind(new.target_entity_id)
    .bind(new.relationship_type.as_str())
    .bind(&new.metadata)
    .fetch_one(&mut *conn)
    .await?;

    Ok(rel)
}

pub struct RelationshipRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> RelationshipRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        new: &NewRelationship,
    ) -> Result<Relationship, DbError> {
        let mut tx = self.pool.begin().await?;
        super::organizations::ensure_active(&mut tx, organization_id).await?;
        let rel = insert_relationship(&mut tx, organization_id, new).await?;
        tx.commit().await?;

        tracing::debug!(
            id = %rel.id,
            kind = %rel.relationship_type,
            "relationship created"
        );
        Ok(rel)
    }

    /// Active relationships where the entity is source or target.
    pub async fn list_for_entity(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
    ) -> Result<Vec<Relationship>, DbError> {
        let mut conn = self.pool.acquire().await?;
        ensure_entity(&mut conn, organization_id, entity_id).await?;

        let rels = sqlx::query_as(&format!(
            r#"
            SELECT {RELATIONSHIP_COLUMNS}
            FROM core_relationships
            WHERE organization_id = $1 AND is_active
              AND (source_entity_id = $2 OR target_entity_id = $2)
            ORDER BY relationship_type, created_at
            "#
        ))
        .bind(organization_id)
        .bind(entity_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rels)
    }

    /// Soft delete.
    pub async fn deactivate(&self, organization_id: Uuid, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE core_relationships SET is_active = FALSE \
             WHERE id = $1 AND organization_id = $2 AND is_active",
        )
        .bind(id)
        .bind(organization_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("relationship", id));
        }
        Ok(())
    }
}
