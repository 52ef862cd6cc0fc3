//! Summary computation.
//!
//! Maps a license document to its derived `{expired, daysRemaining}` pair. The
//! computation is pure for a given clock reading and never fails.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::record::{LicenseRecord, FIELD_DAYS_REMAINING, FIELD_EXPIRED};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Derived status of a license at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseSummary {
    pub expired: bool,
    pub days_remaining: u32,
}

impl LicenseSummary {
    /// The `expired` value as a JSON field value.
    pub fn expired_value(&self) -> Value {
        json!(self.expired)
    }

    /// The `daysRemaining` value as a JSON field value.
    pub fn days_remaining_value(&self) -> Value {
        json!(self.days_remaining)
    }

    /// Whether `doc` already carries exactly this summary.
    pub fn matches(&self, doc: &Value) -> bool {
        doc.get(FIELD_EXPIRED) == Some(&self.expired_value())
            && doc.get(FIELD_DAYS_REMAINING) == Some(&self.days_remaining_value())
    }
}

/// Current time as whole epoch seconds.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Compute the summary of `doc` as of `now` (epoch seconds).
///
/// A license is expired when it is inactive or `now` has reached the normalized
/// `expiresAt`. Days remaining are floored and never negative.
pub fn compute_summary_at(doc: &Value, now: i64) -> LicenseSummary {
    let record = LicenseRecord::new(doc);
    let expires_at = record.expires_at();

    let expired = !record.is_active() || now >= expires_at;
    let days = expires_at.saturating_sub(now).div_euclid(SECONDS_PER_DAY).max(0);

    LicenseSummary {
        expired,
        days_remaining: u32::try_from(days).unwrap_or(u32::MAX),
    }
}

/// Compute the summary of `doc` against the system clock.
pub fn compute_summary(doc: &Value) -> LicenseSummary {
    compute_summary_at(doc, now_secs())
}
