//! Entity name and code validation

use super::validation::bounded_text;
use super::ValidationError;

const MAX_ENTITY_NAME_LEN: usize = 200;
const MAX_ENTITY_CODE_LEN: usize = 64;

/// Validated `entity_name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityName(String);

impl EntityName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text(s, "entity_name", MAX_ENTITY_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated `entity_code`: printable, no whitespace, stored uppercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCode(String);

impl EntityCode {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let code = bounded_text(s, "entity_code", MAX_ENTITY_CODE_LEN)?;

        if code.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ValidationError::InvalidFormat {
                field: "entity_code",
                reason: "must not contain whitespace",
            });
        }

        Ok(Self(code.to_uppercase()))
    }

    /// Validate an optional code, treating blank as absent
    pub fn optional(s: Option<&str>) -> Result<Option<Self>, ValidationError> {
        match s.map(str::trim) {
            None | Some("") => Ok(None),
            Some(code) => Self::new(code).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
