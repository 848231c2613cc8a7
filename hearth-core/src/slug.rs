//! Slug identifiers shared by templates and the API
//!
//! Entity types, field names, relationship types, metadata keys and
//! template keys are lowercase snake_case starting with a letter.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest accepted slug
pub const MAX_SLUG_LEN: usize = 64;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("invalid slug regex"));

/// True for `^[a-z][a-z0-9_]{0,63}$`
pub fn is_slug(s: &str) -> bool {
    SLUG_RE.is_match(s)
}
