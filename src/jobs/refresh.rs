//! Periodic summary refresh job.
//!
//! Summaries go stale as time passes even when nobody edits a record. This job
//! reads the whole license collection in one snapshot, recomputes every summary
//! against a single clock reading, and writes all derived fields back in one
//! multi-path update.

use serde_json::{Map, Value};
use tracing::{debug, info_span, warn, Instrument};

use crate::errors::LicenseResult;
use crate::logging::{generate_invocation_id, log_summary_event, SummaryEvent};
use crate::record::{FIELD_DAYS_REMAINING, FIELD_EXPIRED, FIELD_LAST_COMPUTED_AT};
use crate::store::{BatchUpdate, FieldValue, LicenseStore};
use crate::summary::{compute_summary_at, now_secs};
use crate::validation::validate_record_key;

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Records whose summaries were staged
    pub records: usize,
    /// Field writes in the batch (three per record)
    pub fields: usize,
    /// Whether a batch was written at all
    pub written: bool,
}

/// Record entries of a collection snapshot.
///
/// Objects yield their keys. Arrays (integer-keyed collections) yield their
/// indices, skipping empty slots. Anything else holds no records.
fn collection_entries(snapshot: &Value) -> Vec<(String, &Value)> {
    match snapshot {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Stage `expired`, `daysRemaining` and `lastComputedAt` for every record in `snapshot`.
pub fn stage_refresh(collection: &str, snapshot: &Value, now: i64) -> BatchUpdate {
    let mut batch = BatchUpdate::new();

    for (record_id, doc) in collection_entries(snapshot) {
        if let Err(e) = validate_record_key(&record_id) {
            warn!("Skipping record with unusable key: {e}");
            continue;
        }

        let summary = compute_summary_at(doc, now);
        let base = format!("{collection}/{record_id}");
        batch.stage(format!("{base}/{FIELD_EXPIRED}"), summary.expired_value());
        batch.stage(
            format!("{base}/{FIELD_DAYS_REMAINING}"),
            summary.days_remaining_value(),
        );
        batch.stage(
            format!("{base}/{FIELD_LAST_COMPUTED_AT}"),
            FieldValue::ServerTimestamp,
        );
    }

    batch
}

/// Refresh every summary in `collection` using the system clock.
pub async fn run_summary_refresh<S: LicenseStore + ?Sized>(
    store: &S,
    collection: &str,
) -> LicenseResult<RefreshReport> {
    run_summary_refresh_at(store, collection, now_secs()).await
}

/// Refresh every summary in `collection` as of `now` (epoch seconds).
///
/// An empty collection is a successful no-op. Read and write failures are
/// returned unmodified; nothing is retried here.
pub async fn run_summary_refresh_at<S: LicenseStore + ?Sized>(
    store: &S,
    collection: &str,
    now: i64,
) -> LicenseResult<RefreshReport> {
    let span = info_span!(
        "summary_refresh",
        invocation_id = %generate_invocation_id(),
        collection = %collection,
    );

    refresh_collection(store, collection, now)
        .instrument(span)
        .await
}

async fn refresh_collection<S: LicenseStore + ?Sized>(
    store: &S,
    collection: &str,
    now: i64,
) -> LicenseResult<RefreshReport> {
    debug!("Refreshing license summaries at {}", now);

    let snapshot = store
        .read(collection)
        .await?
        .unwrap_or_else(|| Value::Object(Map::new()));

    let batch = stage_refresh(collection, &snapshot, now);
    let fields = batch.len();
    let records = fields / 3;

    if batch.is_empty() {
        log_summary_event(SummaryEvent::RefreshSkipped, collection, Some("no records"));
        return Ok(RefreshReport::default());
    }

    store.multi_update(batch).await?;

    let details = format!("{records} records, {fields} fields");
    log_summary_event(SummaryEvent::RefreshCompleted, collection, Some(&details));

    Ok(RefreshReport {
        records,
        fields,
        written: true,
    })
}
