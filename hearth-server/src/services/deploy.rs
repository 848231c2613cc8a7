//! Template deployment and organization cloning
//!
//! Both build a [`DeploymentPlan`] (entities keyed by a local ref, plus
//! relationships between refs) and write it into a fresh organization in a
//! single transaction. Any failure leaves no partial organization behind.

use std::collections::HashMap;

use hearth_core::Template;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::inputs::entity_from_template;
use crate::db::repos::entities::{insert_entity, Entity};
use crate::db::repos::dynamic_data::fields_for_entities;
use crate::db::repos::organizations::{insert_organization, Organization};
use crate::db::repos::relationships::insert_relationship;
use crate::db::{DbError, NewEntity, NewRelationship, OrganizationRepo};
use crate::models::{
    EntityCode, EntityName, EntityType, FieldName, OrganizationName, RelationshipType,
    ValidationError,
};

/// Rows to create in a new organization
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub organization_type: String,
    pub industry: Option<String>,
    pub settings: serde_json::Value,
    pub entities: Vec<(String, NewEntity)>,
    pub relationships: Vec<(String, String, RelationshipType)>,
}

impl DeploymentPlan {
    /// Validate a template into a plan.
    pub fn from_template(template: &Template) -> Result<Self, ValidationError> {
        let entities = template
            .entities
            .iter()
            .map(|e| Ok((e.reference.clone(), entity_from_template(e)?)))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let relationships = template
            .relationships
            .iter()
            .map(|r| {
                Ok((
                    r.source.clone(),
                    r.target.clone(),
                    RelationshipType::new(&r.relationship_type)?,
                ))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Self {
            organization_type: template.organization_type.clone(),
            industry: None,
            settings: serde_json::json!({ "template": template.key }),
            entities,
            relationships,
        })
    }
}

/// Result of a deployment
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub organization_id: Uuid,
    pub organization_code: String,
    pub entities_created: usize,
    pub relationships_created: usize,
}

pub struct TemplateDeployer<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateDeployer<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new organization named `name` from a template.
    pub async fn deploy_template(
        &self,
        template: &Template,
        name: &OrganizationName,
    ) -> Result<Deployment, DeployError> {
        let plan = DeploymentPlan::from_template(template)?;
        let deployment = self.apply(&plan, name).await?;

        tracing::info!(
            template = %template.key,
            organization_id = %deployment.organization_id,
            entities = deployment.entities_created,
            relationships = deployment.relationships_created,
            "template deployed"
        );
        Ok(deployment)
    }

    /// Copy the active entities, fields and relationships of `source_id`
    /// into a new organization.
    pub async fn clone_organization(
        &self,
        source_id: Uuid,
        name: &OrganizationName,
    ) -> Result<Deployment, DeployError> {
        let source = OrganizationRepo::new(self.pool).get(source_id).await?;
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        let plan = plan_from_organization(&mut conn, &source).await?;
        drop(conn);

        let deployment = self.apply(&plan, name).await?;
        tracing::info!(
            source = %source_id,
            organization_id = %deployment.organization_id,
            entities = deployment.entities_created,
            "organization cloned"
        );
        Ok(deployment)
    }

    /// Write a plan in one transaction.
    pub async fn apply(
        &self,
        plan: &DeploymentPlan,
        name: &OrganizationName,
    ) -> Result<Deployment, DbError> {
        let mut tx = self.pool.begin().await?;

        let org = insert_organization(
            &mut tx,
            name,
            &plan.organization_type,
            plan.industry.as_deref(),
            &plan.settings,
        )
        .await?;

        let mut ids: HashMap<&str, Uuid> = HashMap::with_capacity(plan.entities.len());
        for (reference, new) in &plan.entities {
            let created = insert_entity(&mut tx, org.id, new).await?;
            ids.insert(reference.as_str(), created.entity.id);
        }

        for (source, target, relationship_type) in &plan.relationships {
            let resolve = |r: &str| {
                ids.get(r)
                    .copied()
                    .ok_or_else(|| DbError::InvalidReference(format!("unknown ref '{}'", r)))
            };
            let new = NewRelationship {
                source_entity_id: resolve(source)?,
                target_entity_id: resolve(target)?,
                relationship_type: relationship_type.clone(),
                metadata: serde_json::json!({}),
            };
            insert_relationship(&mut tx, org.id, &new).await?;
        }

        tx.commit().await?;

        Ok(Deployment {
            organization_id: org.id,
            organization_code: org.organization_code,
            entities_created: plan.entities.len(),
            relationships_created: plan.relationships.len(),
        })
    }
}

/// Read an organization's active rows into a plan keyed by entity id.
async fn plan_from_organization(
    conn: &mut PgConnection,
    source: &Organization,
) -> Result<DeploymentPlan, DeployError> {
    let entities: Vec<Entity> = sqlx::query_as(
        "SELECT id, organization_id, entity_type, entity_name, entity_code, status, \
         is_active, created_at, updated_at \
         FROM core_entities WHERE organization_id = $1 AND is_active \
         ORDER BY created_at",
    )
    .bind(source.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DbError::from)?;

    let ids: Vec<Uuid> = entities.iter().map(|e| e.id).collect();
    let mut fields_by_entity: HashMap<Uuid, Vec<_>> = HashMap::new();
    for field in fields_for_entities(conn, &ids).await? {
        fields_by_entity.entry(field.entity_id).or_default().push(field);
    }

    let mut planned = Vec::with_capacity(entities.len());
    for entity in entities {
        let fields = fields_by_entity
            .remove(&entity.id)
            .unwrap_or_default()
            .into_iter()
            .map(|f| Ok((FieldName::new(&f.field_name)?, f.value)))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let new = NewEntity {
            entity_type: EntityType::new(&entity.entity_type)?,
            name: EntityName::new(&entity.entity_name)?,
            code: EntityCode::optional(entity.entity_code.as_deref())?,
            status: Some(entity.status),
            fields,
        };
        planned.push((entity.id.to_string(), new));
    }

    let relationships: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
        "SELECT source_entity_id, target_entity_id, relationship_type \
         FROM core_relationships WHERE organization_id = $1 AND is_active \
         ORDER BY created_at",
    )
    .bind(source.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DbError::from)?;

    let relationships = relationships
        .into_iter()
        .map(|(s, t, kind)| Ok((s.to_string(), t.to_string(), RelationshipType::new(&kind)?)))
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(DeploymentPlan {
        organization_type: source.organization_type.clone(),
        industry: source.industry.clone(),
        settings: serde_json::json!({ "cloned_from": source.id }),
        entities: planned,
        relationships,
    })
}

/// Deployment failure: bad input rows or a database error
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Db(#[from] DbError),
}
