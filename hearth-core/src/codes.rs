//! Human-readable codes for organizations and transactions
//!
//! Codes carry a random suffix; uniqueness is enforced by the database and
//! callers retry on conflict.

use chrono::NaiveDate;
use rand::Rng;

/// Characters used for random suffixes (uppercase base-36)
const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of the random suffix
const SUFFIX_LEN: usize = 4;

/// Maximum characters taken from the organization name
const MAX_STEM_LEN: usize = 8;

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Generate an organization code from its name.
///
/// Keeps the first eight ASCII alphanumerics, uppercased, then appends a
/// random suffix. Names with no usable characters get the `ORG` stem.
///
/// # Example
/// ```
/// use hearth_core::organization_code;
///
/// let code = organization_code("Mario's Pizza", &mut rand::thread_rng());
/// assert!(code.starts_with("MARIOSPI-"));
/// assert_eq!(code.len(), "MARIOSPI-".len() + 4);
/// ```
pub fn organization_code<R: Rng + ?Sized>(name: &str, rng: &mut R) -> String {
    let stem: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_STEM_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let stem = if stem.is_empty() { "ORG".to_string() } else { stem };
    format!("{}-{}", stem, random_suffix(rng))
}

/// Generate a transaction code like `PO-20260118-4F9A`.
pub fn transaction_code<R: Rng + ?Sized>(prefix: &str, date: NaiveDate, rng: &mut R) -> String {
    format!(
        "{}-{}-{}",
        prefix.trim().to_ascii_uppercase(),
        date.format("%Y%m%d"),
        random_suffix(rng)
    )
}
