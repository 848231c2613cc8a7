//! Dynamic field values
//!
//! `core_dynamic_data` has one value column per type; exactly one is set,
//! named by `field_type`.

use serde_json::Value;

use super::validation::{reject_nul, storable_json};
use super::ValidationError;

/// Maximum length of a text value
const MAX_TEXT_LEN: usize = 10_000;

/// A typed EAV value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Json(Value),
}

impl FieldValue {
    /// Map a JSON request value onto a typed column.
    ///
    /// # Example
    /// ```
    /// use hearth_server::models::FieldValue;
    /// use serde_json::json;
    ///
    /// assert_eq!(FieldValue::from_json(json!(4)).unwrap(), FieldValue::Number(4.0));
    /// assert!(FieldValue::from_json(json!(null)).is_err());
    /// ```
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Null => Err(ValidationError::Empty { field: "field value" }),
            Value::Bool(b) => Ok(Self::Boolean(b)),
            Value::Number(n) => n.as_f64().map(Self::Number).ok_or(ValidationError::OutOfRange {
                field: "field value",
                reason: "number is not representable",
            }),
            Value::String(s) => {
                if s.chars().count() > MAX_TEXT_LEN {
                    return Err(ValidationError::TooLong {
                        field: "field value",
                        max: MAX_TEXT_LEN,
                    });
                }
                reject_nul(&s, "field value")?;
                Ok(Self::Text(s))
            }
            json @ (Value::Array(_) | Value::Object(_)) => {
                storable_json(&json, "field value")?;
                Ok(Self::Json(json))
            }
        }
    }

    /// Value of the `field_type` column
    pub fn field_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Json(_) => "json",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Rebuild from the stored columns; `None` if the row is inconsistent.
    pub fn from_columns(
        field_type: &str,
        text: Option<String>,
        number: Option<f64>,
        boolean: Option<bool>,
        json: Option<Value>,
    ) -> Option<Self> {
        match field_type {
            "text" => text.map(Self::Text),
            "number" => number.map(Self::Number),
            "boolean" => boolean.map(Self::Boolean),
            "json" => json.map(Self::Json),
            _ => None,
        }
    }

    /// JSON form for responses
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Json(v) => v.clone(),
        }
    }
}
