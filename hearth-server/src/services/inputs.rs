//! Request records to validated repository input
//!
//! The entity and user create endpoints accept the same shapes bulk upload
//! parses, so both paths validate through here.

use std::collections::BTreeMap;

use hearth_core::{ApproverRole, EntityRecord, TemplateEntity, UserRecord};
use serde_json::Value;

use crate::db::NewEntity;
use crate::models::{
    Email, EntityCode, EntityName, EntityType, FieldName, FieldValue, ValidationError,
    USER_ENTITY_TYPE,
};

/// Validate a field map. Map order (sorted by name) is kept.
pub fn parse_fields(
    fields: &BTreeMap<String, Value>,
) -> Result<Vec<(FieldName, FieldValue)>, ValidationError> {
    fields
        .iter()
        .map(|(name, value)| Ok((FieldName::new(name)?, FieldValue::from_json(value.clone())?)))
        .collect()
}

pub fn entity_from_record(record: &EntityRecord) -> Result<NewEntity, ValidationError> {
    let entity_type = EntityType::new(&record.entity_type)?;
    if entity_type.as_str() == USER_ENTITY_TYPE {
        return Err(ValidationError::Rule {
            field: "entity_type".to_string(),
            message: "users are created through the users endpoint".to_string(),
        });
    }

    Ok(NewEntity {
        entity_type,
        name: EntityName::new(&record.entity_name)?,
        code: EntityCode::optional(record.entity_code.as_deref())?,
        status: None,
        fields: parse_fields(&record.fields)?,
    })
}

/// A user is a `user` entity carrying `email` and `role` fields.
pub fn user_from_record(record: &UserRecord) -> Result<NewEntity, ValidationError> {
    let email = Email::new(&record.email)?;
    let role: ApproverRole = record.role.parse().map_err(|_| ValidationError::InvalidVariant {
        field: "role",
        value: record.role.clone(),
    })?;

    Ok(NewEntity {
        entity_type: EntityType::new(USER_ENTITY_TYPE)?,
        name: EntityName::new(&record.name)?,
        code: None,
        status: None,
        fields: vec![
            (
                FieldName::new("email")?,
                FieldValue::Text(email.as_str().to_string()),
            ),
            (
                FieldName::new("role")?,
                FieldValue::Text(role.as_str().to_string()),
            ),
        ],
    })
}

pub fn entity_from_template(entity: &TemplateEntity) -> Result<NewEntity, ValidationError> {
    Ok(NewEntity {
        entity_type: EntityType::new(&entity.entity_type)?,
        name: EntityName::new(&entity.entity_name)?,
        code: EntityCode::optional(entity.entity_code.as_deref())?,
        status: None,
        fields: parse_fields(&entity.fields)?,
    })
}
