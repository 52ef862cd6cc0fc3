//! Change-driven summary maintenance.
//!
//! The host platform calls [`ChangeReactor::on_write`] whenever a record under the
//! license collection is created, updated or deleted. The reactor recomputes the
//! summary from the post-change document and writes the three derived fields back
//! to the same record. Writing them re-triggers the host, but the recomputation
//! lands on the same values, so the loop settles after one round.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

use crate::errors::LicenseResult;
use crate::logging::{generate_invocation_id, log_summary_event, SummaryEvent};
use crate::record::{is_truthy, FIELD_DAYS_REMAINING, FIELD_EXPIRED, FIELD_LAST_COMPUTED_AT};
use crate::store::{FieldMap, FieldValue, LicenseStore};
use crate::summary::{compute_summary_at, now_secs, LicenseSummary};
use crate::validation::validate_record_key;

/// Before/after snapshots of one record, as delivered by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChange {
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl RecordChange {
    pub fn new(before: Option<Value>, after: Option<Value>) -> Self {
        Self { before, after }
    }

    /// The post-change document, or `None` when the record was deleted.
    ///
    /// A falsy after-value (`null`, `false`, `0`, `""`) is treated as a delete.
    pub fn after(&self) -> Option<&Value> {
        self.after.as_ref().filter(|v| is_truthy(v))
    }

    pub fn is_delete(&self) -> bool {
        self.after().is_none()
    }
}

/// Field updates carrying `summary` plus a fresh server timestamp.
pub fn summary_fields(summary: &LicenseSummary) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(
        FIELD_EXPIRED.to_string(),
        FieldValue::Value(summary.expired_value()),
    );
    fields.insert(
        FIELD_DAYS_REMAINING.to_string(),
        FieldValue::Value(summary.days_remaining_value()),
    );
    fields.insert(FIELD_LAST_COMPUTED_AT.to_string(), FieldValue::ServerTimestamp);
    fields
}

/// Recomputes one record's summary per change event.
pub struct ChangeReactor<S: LicenseStore + ?Sized> {
    store: Arc<S>,
    collection: String,
}

impl<S: LicenseStore + ?Sized> ChangeReactor<S> {
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Handle a write event for `record_id` using the system clock.
    ///
    /// Returns the summary that was written, or `None` for a delete.
    pub async fn on_write(
        &self,
        record_id: &str,
        change: &RecordChange,
    ) -> LicenseResult<Option<LicenseSummary>> {
        self.on_write_at(record_id, change, now_secs()).await
    }

    /// Handle a write event as of `now` (epoch seconds).
    ///
    /// Store failures are returned as-is; the host decides whether to retry.
    pub async fn on_write_at(
        &self,
        record_id: &str,
        change: &RecordChange,
        now: i64,
    ) -> LicenseResult<Option<LicenseSummary>> {
        let span = info_span!(
            "license_write",
            invocation_id = %generate_invocation_id(),
            record_id = %record_id,
        );

        self.recompute(record_id, change, now)
            .instrument(span)
            .await
    }

    async fn recompute(
        &self,
        record_id: &str,
        change: &RecordChange,
        now: i64,
    ) -> LicenseResult<Option<LicenseSummary>> {
        let Some(after) = change.after() else {
            log_summary_event(SummaryEvent::DeleteSkipped, record_id, None);
            return Ok(None);
        };

        validate_record_key(record_id)?;

        let summary = compute_summary_at(after, now);
        if summary.matches(after) {
            debug!("Stored summary already current, refreshing timestamp");
        }

        let path = format!("{}/{}", self.collection, record_id);
        self.store.update(&path, summary_fields(&summary)).await?;

        let details = format!(
            "expired={} days_remaining={}",
            summary.expired, summary.days_remaining
        );
        log_summary_event(SummaryEvent::Recomputed, record_id, Some(&details));

        Ok(Some(summary))
    }
}
