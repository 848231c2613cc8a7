//! Per-entity key/value metadata (JSON values)

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::entities::ensure_entity;
use super::DbError;
use crate::models::MetadataKey;

#[derive(Debug, Clone, FromRow)]
pub struct MetadataEntry {
    pub entity_id: Uuid,
    pub metadata_key: String,
    pub metadata_value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

pub struct MetadataRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> MetadataRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
        key: &MetadataKey,
    ) -> Result<MetadataEntry, DbError> {
        sqlx::query_as(
            r#"
            SELECT m.entity_id, m.metadata_key, m.metadata_value, m.updated_at
            FROM core_metadata m
            JOIN core_entities e ON e.id = m.entity_id AND e.is_active
            WHERE m.organization_id = $1 AND m.entity_id = $2 AND m.metadata_key = $3
            "#,
        )
        .bind(organization_id)
        .bind(entity_id)
        .bind(key.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("metadata", key.as_str()))
    }

    /// Insert or replace a key.
    pub async fn put(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
        key: &MetadataKey,
        value: &serde_json::Value,
    ) -> Result<MetadataEntry, DbError> {
        let mut tx = self.pool.begin().await?;
        ensure_entity(&mut tx, organization_id, entity_id).await?;

        let entry = sqlx::query_as(
            r#"
            INSERT INTO core_metadata (organization_id, entity_id, metadata_key, metadata_value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (entity_id, metadata_key) DO UPDATE SET
                metadata_value = EXCLUDED.metadata_value,
                updated_at = NOW()
            RETURNING entity_id, metadata_key, metadata_value, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(entity_id)
        .bind(key.as_str())
        .bind(value)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(entry)
    }

    pub async fn list_for_entity(
        &self,
        organization_id: Uuid,
        entity_id: Uuid,
    ) -> Result<Vec<MetadataEntry>, DbError> {
        let mut conn = self.pool.acquire().await?;
        ensure_entity(&mut conn, organization_id, entity_id).await?;

        let entries = sqlx::query_as(
            "SELECT entity_id, metadata_key, metadata_value, updated_at \
             FROM core_metadata WHERE organization_id = $1 AND entity_id = $2 \
             ORDER BY metadata_key",
        )
        .bind(organization_id)
        .bind(entity_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(entries)
    }
}
