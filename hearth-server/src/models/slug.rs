//! Slug-shaped identifiers
//!
//! Entity types, field names, relationship types and metadata keys are all
//! free text in the schema; the API narrows them to lowercase snake_case.

use hearth_core::slug::{is_slug, MAX_SLUG_LEN};

use super::ValidationError;

fn validate_slug(s: &str, field: &'static str) -> Result<String, ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::Empty { field });
    }

    if s.len() > MAX_SLUG_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_SLUG_LEN,
        });
    }

    if !is_slug(s) {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be lowercase snake_case starting with a letter",
        });
    }

    Ok(s.to_owned())
}

macro_rules! slug_type {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: &str) -> Result<Self, ValidationError> {
                validate_slug(s, $field).map(Self)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

slug_type!(
    /// `core_entities.entity_type`, e.g. `menu_item`, `supplier`, `user`
    EntityType,
    "entity_type"
);

slug_type!(
    /// `core_dynamic_data.field_name`
    FieldName,
    "field_name"
);

slug_type!(
    /// `core_relationships.relationship_type`, e.g. `supplied_by`
    RelationshipType,
    "relationship_type"
);

slug_type!(
    /// `core_metadata.metadata_key`
    MetadataKey,
    "metadata_key"
);
