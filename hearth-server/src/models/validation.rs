//! Validation error types

use std::fmt;

use serde_json::Value;

/// Validation error for request input
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format (e.g., slug)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Value outside the accepted range
    OutOfRange { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Rejected by a business rule in hearth-core
    Rule { field: String, message: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } | Self::OutOfRange { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::Rule { field, message } => write!(f, "{}: {}", field, message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim `s` and enforce non-empty and a character limit
pub(crate) fn bounded_text(
    s: &str,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }

    reject_nul(trimmed, field)?;

    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }

    Ok(trimmed.to_owned())
}

const NUL_REASON: &str = "must not contain NUL characters";

/// Postgres `TEXT` cannot store U+0000
pub(crate) fn reject_nul(s: &str, field: &'static str) -> Result<(), ValidationError> {
    if s.contains('\0') {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: NUL_REASON,
        });
    }
    Ok(())
}

/// Same rule for `JSONB`: no U+0000 in any string or object key
pub(crate) fn storable_json(value: &Value, field: &'static str) -> Result<(), ValidationError> {
    match value {
        Value::String(s) => reject_nul(s, field),
        Value::Array(items) => items.iter().try_for_each(|v| storable_json(v, field)),
        Value::Object(map) => map.iter().try_for_each(|(k, v)| {
            reject_nul(k, field)?;
            storable_json(v, field)
        }),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "organization name",
            max: 120,
        };
        assert_eq!(
            err.to_string(),
            "organization name exceeds maximum length of 120 characters"
        );

        let err = ValidationError::OutOfRange {
            field: "quantity",
            reason: "must be greater than zero",
        };
        assert_eq!(err.to_string(), "quantity: must be greater than zero");
    }

    #[test]
    fn bounded_text_counts_chars_not_bytes() {
        assert_eq!(bounded_text("  Café  ", "name", 4).unwrap(), "Café");
        assert!(matches!(
            bounded_text("Cafés", "name", 4),
            Err(ValidationError::TooLong { max: 4, .. })
        ));
        assert!(matches!(
            bounded_text("   ", "name", 4),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn nul_is_rejected_in_text_and_json() {
        assert!(matches!(
            bounded_text("Bad\u{0}Name", "entity_name", 200),
            Err(ValidationError::InvalidFormat { field: "entity_name", .. })
        ));

        let nested = serde_json::json!({ "tags": ["ok", "b\u{0}d"] });
        assert!(storable_json(&nested, "metadata").is_err());

        let key = serde_json::json!({ "k\u{0}": 1 });
        assert!(storable_json(&key, "metadata").is_err());

        assert!(storable_json(&serde_json::json!({ "hours": [9, 17] }), "metadata").is_ok());
    }
}
