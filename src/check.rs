//! Client-side license check.
//!
//! The desktop client reads its own license record and decides whether it may run.
//! Unlike the stored summary, the check applies a grace window: a license that
//! expires within `grace_secs` is already treated as expired.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::record::{has_content, LicenseRecord};
use crate::summary::SECONDS_PER_DAY;

/// Default grace window, in seconds.
pub const DEFAULT_GRACE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Valid,
    /// No record exists for the user.
    Missing,
    Inactive,
    Expired,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckStatus::Valid => "license is valid",
            CheckStatus::Missing => "no license exists for this user",
            CheckStatus::Inactive => "license is inactive",
            CheckStatus::Expired => "license has expired",
        };
        write!(f, "{}", s)
    }
}

/// Result of checking a license record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseCheck {
    pub ok: bool,
    pub status: CheckStatus,
    pub active: bool,
    pub plan: String,
    /// Normalized expiry, epoch seconds.
    pub expires_at: i64,
    pub days_remaining: u32,
    pub notes: String,
}

impl LicenseCheck {
    fn missing() -> Self {
        Self {
            ok: false,
            status: CheckStatus::Missing,
            active: false,
            plan: String::new(),
            expires_at: 0,
            days_remaining: 0,
            notes: String::new(),
        }
    }

    /// Human-readable one-line message for the client UI.
    pub fn message(&self) -> String {
        match self.status {
            CheckStatus::Valid => format!(
                "OK, plan: {} | days remaining: {}",
                self.plan, self.days_remaining
            ),
            other => other.to_string(),
        }
    }
}

/// Check a license record as of `now` (epoch seconds).
///
/// `record` is `None` when the user has no license. A record with no content
/// (`null`, `false`, `0`, `{}`) counts as missing too.
pub fn check_license(record: Option<&Value>, now: i64, grace_secs: i64) -> LicenseCheck {
    let doc = match record {
        Some(doc) if has_content(doc) => doc,
        _ => return LicenseCheck::missing(),
    };

    let record = LicenseRecord::new(doc);
    let active = record.is_active();
    let expires_at = record.expires_at();
    let days = expires_at.saturating_sub(now).div_euclid(SECONDS_PER_DAY).max(0);
    let days_remaining = u32::try_from(days).unwrap_or(u32::MAX);

    let mut check = LicenseCheck {
        ok: false,
        status: CheckStatus::Valid,
        active,
        plan: record.plan(),
        expires_at,
        days_remaining,
        notes: record.notes(),
    };

    if !active {
        check.status = CheckStatus::Inactive;
    } else if now.saturating_add(grace_secs) >= expires_at {
        check.status = CheckStatus::Expired;
        check.days_remaining = 0;
    } else {
        check.ok = true;
    }

    check
}

/// Epoch seconds `days` days after `now`.
pub fn expires_at_in_days(days: u32, now: i64) -> i64 {
    now.saturating_add(i64::from(days) * SECONDS_PER_DAY)
}
