//! Organization templates
//!
//! A template is a YAML bundle of entities (with dynamic fields) and the
//! relationships between them. Deploying one creates a new organization
//! and copies every row into it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, Result};
use crate::slug::is_slug;

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("restaurant", include_str!("../templates/restaurant.yaml")),
    ("cafe", include_str!("../templates/cafe.yaml")),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub key: String,
    pub name: String,
    #[serde(default = "default_org_type")]
    pub organization_type: String,
    #[serde(default)]
    pub entities: Vec<TemplateEntity>,
    #[serde(default)]
    pub relationships: Vec<TemplateRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateEntity {
    /// Local name used by relationships inside the template
    #[serde(rename = "ref")]
    pub reference: String,
    pub entity_type: String,
    pub entity_name: String,
    #[serde(default)]
    pub entity_code: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateRelationship {
    pub source: String,
    pub target: String,
    pub relationship_type: String,
}

fn default_org_type() -> String {
    "restaurant".to_string()
}

impl Template {
    /// Parse and validate a template from YAML.
    pub fn from_yaml(source: &str) -> Result<Self> {
        let template: Self = serde_yaml::from_str(source)
            .map_err(|e| HearthError::template("<yaml>", e.to_string()))?;
        template.validate()?;
        Ok(template)
    }

    /// All templates compiled into the binary.
    pub fn builtin_all() -> Result<Vec<Self>> {
        BUILTIN_SOURCES
            .iter()
            .map(|(_, source)| Self::from_yaml(source))
            .collect()
    }

    /// Look up a compiled-in template by key.
    pub fn builtin(key: &str) -> Result<Option<Self>> {
        BUILTIN_SOURCES
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, source)| Self::from_yaml(source))
            .transpose()
    }

    /// Check references and slugs.
    pub fn validate(&self) -> Result<()> {
        if !is_slug(&self.key) {
            return Err(HearthError::template(&self.key, "key must be a lowercase slug"));
        }

        let mut refs = HashSet::new();
        for entity in &self.entities {
            if !refs.insert(entity.reference.as_str()) {
                return Err(HearthError::template(
                    &self.key,
                    format!("duplicate ref '{}'", entity.reference),
                ));
            }
            if !is_slug(&entity.entity_type) {
                return Err(HearthError::template(
                    &self.key,
                    format!("entity '{}' has invalid type '{}'", entity.reference, entity.entity_type),
                ));
            }
            if entity.entity_name.trim().is_empty() {
                return Err(HearthError::template(
                    &self.key,
                    format!("entity '{}' has an empty name", entity.reference),
                ));
            }
            if let Some(field) = entity.fields.keys().find(|k| !is_slug(k)) {
                return Err(HearthError::template(
                    &self.key,
                    format!("entity '{}' has invalid field name '{}'", entity.reference, field),
                ));
            }
        }

        for rel in &self.relationships {
            for end in [&rel.source, &rel.target] {
                if !refs.contains(end.as_str()) {
                    return Err(HearthError::template(
                        &self.key,
                        format!("relationship refers to unknown ref '{}'", end),
                    ));
                }
            }
            if rel.source == rel.target {
                return Err(HearthError::template(
                    &self.key,
                    format!("'{}' cannot relate to itself", rel.source),
                ));
            }
            if !is_slug(&rel.relationship_type) {
                return Err(HearthError::template(
                    &self.key,
                    format!("invalid relationship type '{}'", rel.relationship_type),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse_and_validate() {
        let templates = Template::builtin_all().unwrap();
        let keys: Vec<_> = templates.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["restaurant", "cafe"]);
        assert!(templates.iter().all(|t| !t.entities.is_empty()));
    }

    #[test]
    fn builtin_key_matches_file_key() {
        for (key, _) in BUILTIN_SOURCES {
            let template = Template::builtin(key).unwrap().unwrap();
            assert_eq!(&template.key, key);
        }
        assert!(Template::builtin("food-truck").unwrap().is_none());
    }

    #[test]
    fn restaurant_has_an_owner_user() {
        let template = Template::builtin("restaurant").unwrap().unwrap();
        let owner = template
            .entities
            .iter()
            .find(|e| e.entity_type == "user")
            .unwrap();
        assert_eq!(owner.fields["role"], serde_json::json!("owner"));
    }

    #[test]
    fn rejects_unknown_relationship_ref() {
        let yaml = r#"
key: broken
name: Broken
entities:
  - ref: a
    entity_type: menu_item
    entity_name: A
relationships:
  - source: a
    target: b
    relationship_type: pairs_with
"#;
        let err = Template::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown ref 'b'"));
    }

    #[test]
    fn rejects_duplicate_refs() {
        let yaml = r#"
key: dup
name: Dup
entities:
  - ref: a
    entity_type: menu_item
    entity_name: A
  - ref: a
    entity_type: menu_item
    entity_name: Another A
"#;
        let err = Template::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate ref"));
    }

    #[test]
    fn rejects_self_relationship() {
        let yaml = r#"
key: loop
name: Loop
entities:
  - ref: a
    entity_type: menu_item
    entity_name: A
relationships:
  - source: a
    target: a
    relationship_type: pairs_with
"#;
        assert!(Template::from_yaml(yaml).is_err());
    }

    #[test]
    fn defaults_organization_type() {
        let template = Template::from_yaml("key: bare\nname: Bare\n").unwrap();
        assert_eq!(template.organization_type, "restaurant");
        assert!(template.entities.is_empty());
    }
}
