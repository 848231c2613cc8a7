//! Organization name validation

use super::validation::bounded_text;
use super::ValidationError;

/// Maximum length for organization names
const MAX_ORG_NAME_LEN: usize = 120;

/// Validated organization name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationName(String);

impl OrganizationName {
    /// Create a new organization name.
    ///
    /// # Rules
    /// - Non-empty after trimming whitespace
    /// - Max 120 characters
    ///
    /// # Example
    /// ```
    /// use hearth_server::models::OrganizationName;
    ///
    /// assert!(OrganizationName::new("Mario's Pizza").is_ok());
    /// assert!(OrganizationName::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text(s, "organization_name", MAX_ORG_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OrganizationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
