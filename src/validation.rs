//! Record key validation.
//!
//! Record ids become path segments (`licenses/<id>/expired`), so they must follow
//! the store's key rules: non-empty, at most 768 bytes, and free of `.`, `$`, `#`,
//! `[`, `]`, `/` and ASCII control characters.

use regex::Regex;
use std::sync::OnceLock;

use crate::errors::{LicenseError, LicenseResult};

/// Longest key the store accepts, in bytes.
pub const MAX_KEY_BYTES: usize = 768;

fn forbidden_chars() -> &'static Regex {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    FORBIDDEN.get_or_init(|| Regex::new(r"[.$#\[\]/\x00-\x1F\x7F]").expect("static pattern"))
}

/// Validate a record id (or collection name) as a single store path segment.
///
/// # Example
/// ```
/// use license_summary::validation::validate_record_key;
///
/// assert!(validate_record_key("u1").is_ok());
/// assert!(validate_record_key("Xk3-_a9").is_ok());
/// assert!(validate_record_key("users/u1").is_err());
/// assert!(validate_record_key("").is_err());
/// ```
pub fn validate_record_key(key: &str) -> LicenseResult<()> {
    let invalid = |reason: String| LicenseError::InvalidRecordKey {
        key: key.to_string(),
        reason,
    };

    if key.is_empty() {
        return Err(invalid("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(invalid(format!(
            "key is {} bytes, maximum is {MAX_KEY_BYTES}",
            key.len()
        )));
    }
    if let Some(m) = forbidden_chars().find(key) {
        return Err(invalid(format!(
            "contains forbidden character {:?}",
            m.as_str()
        )));
    }

    Ok(())
}

/// Split a `/`-separated store path into validated segments.
pub fn split_path(path: &str) -> LicenseResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(LicenseError::InvalidPath(format!("'{path}' has no segments")));
    }

    trimmed
        .split('/')
        .map(|segment| {
            validate_record_key(segment)
                .map(|_| segment)
                .map_err(|e| LicenseError::InvalidPath(format!("'{path}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_ids() {
        assert!(validate_record_key("u1").is_ok());
        assert!(validate_record_key("kZ9qWfL2mPbXc0RtYv7sHn4aJdE3").is_ok());
        assert!(validate_record_key("user@example,com").is_ok());
    }

    #[test]
    fn rejects_forbidden_characters() {
        for key in ["a.b", "a$b", "a#b", "a[b", "a]b", "a/b", "a\nb"] {
            let err = validate_record_key(key).unwrap_err();
            assert!(
                matches!(err, LicenseError::InvalidRecordKey { .. }),
                "expected rejection for {key:?}"
            );
        }
    }

    #[test]
    fn rejects_oversized_keys() {
        let key = "k".repeat(MAX_KEY_BYTES + 1);
        assert!(validate_record_key(&key).is_err());
        assert!(validate_record_key(&"k".repeat(MAX_KEY_BYTES)).is_ok());
    }

    #[test]
    fn split_path_ignores_outer_slashes() {
        let segments = split_path("/licenses/u1/expired/").unwrap();
        assert_eq!(segments, vec!["licenses", "u1", "expired"]);
    }

    #[test]
    fn split_path_rejects_empty_segments() {
        assert!(matches!(
            split_path("licenses//expired"),
            Err(LicenseError::InvalidPath(_))
        ));
        assert!(matches!(split_path("/"), Err(LicenseError::InvalidPath(_))));
    }
}
