//! License record field access.
//!
//! Records are schemaless JSON documents written by other actors, so every field
//! is read leniently: missing or malformed values fall back to falsy/zero instead
//! of failing.

use serde_json::Value;

/// Field holding the activation flag.
pub const FIELD_ACTIVE: &str = "active";
/// Field holding the expiry timestamp, in seconds or milliseconds.
pub const FIELD_EXPIRES_AT: &str = "expiresAt";
/// Derived: whether the license is expired.
pub const FIELD_EXPIRED: &str = "expired";
/// Derived: whole days left before expiry.
pub const FIELD_DAYS_REMAINING: &str = "daysRemaining";
/// Derived: server timestamp (epoch millis) of the last recomputation.
pub const FIELD_LAST_COMPUTED_AT: &str = "lastComputedAt";
pub const FIELD_PLAN: &str = "plan";
pub const FIELD_NOTES: &str = "notes";

/// Values at or above this are treated as epoch milliseconds.
pub const MILLIS_THRESHOLD: f64 = 1e12;

static NULL: Value = Value::Null;

/// Loose truthiness: `null`, `false`, `0`, and `""` are falsy, everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whether `value` holds anything at all: truthy, and not an empty object or array.
pub fn has_content(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        other => is_truthy(other),
    }
}

/// Coerce a JSON value to a number the way a loosely typed writer would expect.
///
/// Returns `None` for values with no numeric reading (objects, arrays, junk strings).
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Normalize an `expiresAt` value to whole epoch seconds.
///
/// Values ≥ 1e12 are milliseconds and are floor-divided by 1000; smaller values
/// are already seconds and are floored. Non-finite or non-numeric input yields 0.
///
/// # Example
/// ```
/// use serde_json::json;
/// use license_summary::record::normalize_expires_at;
///
/// assert_eq!(normalize_expires_at(&json!(1_700_000_000_000u64)), 1_700_000_000);
/// assert_eq!(normalize_expires_at(&json!(1_700_000_000)), 1_700_000_000);
/// assert_eq!(normalize_expires_at(&json!("soon")), 0);
/// ```
pub fn normalize_expires_at(value: &Value) -> i64 {
    let v = match coerce_number(value) {
        Some(v) if v.is_finite() => v,
        _ => return 0,
    };

    if v >= MILLIS_THRESHOLD {
        (v / 1000.0).floor() as i64
    } else {
        v.floor() as i64
    }
}

/// Borrowed view over a license document.
#[derive(Debug, Clone, Copy)]
pub struct LicenseRecord<'a> {
    doc: &'a Value,
}

impl<'a> LicenseRecord<'a> {
    pub fn new(doc: &'a Value) -> Self {
        Self { doc }
    }

    fn field(&self, name: &str) -> &'a Value {
        // Non-object documents behave as empty records.
        self.doc.get(name).unwrap_or(&NULL)
    }

    pub fn is_active(&self) -> bool {
        is_truthy(self.field(FIELD_ACTIVE))
    }

    /// `expiresAt` normalized to epoch seconds.
    pub fn expires_at(&self) -> i64 {
        normalize_expires_at(self.field(FIELD_EXPIRES_AT))
    }

    /// The plan name. Non-string values are rendered as JSON text.
    pub fn plan(&self) -> String {
        match self.field(FIELD_PLAN) {
            Value::Null => "unknown".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn notes(&self) -> String {
        self.field(FIELD_NOTES).as_str().unwrap_or_default().to_string()
    }
}
