//! Users are entities of type `user` with `email` and `role` fields

use once_cell::sync::Lazy;
use regex::Regex;

use super::validation::reject_nul;
use super::ValidationError;

/// `entity_type` used for user rows
pub const USER_ENTITY_TYPE: &str = "user";

/// Maximum length for email addresses
const MAX_EMAIL_LEN: usize = 254;

/// Loose shape check: something@something.tld, no whitespace
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex"));

/// Validated email, stored lowercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }

        if trimmed.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_EMAIL_LEN,
            });
        }

        reject_nul(trimmed, "email")?;

        if !EMAIL_RE.is_match(trimmed) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                reason: "must look like name@example.com",
            });
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases() {
        assert_eq!(Email::new(" Chef@Harbor.io ").unwrap().as_str(), "chef@harbor.io");
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["chef", "chef@", "@harbor.io", "chef@harbor", "a b@c.io"] {
            assert!(Email::new(bad).is_err(), "{} should be rejected", bad);
        }
    }
}
