//! Integration tests for the periodic summary refresh.

use serde_json::json;

use license_summary::jobs::{run_summary_refresh, run_summary_refresh_at, RefreshReport};
use license_summary::store::{LicenseStore, MemoryStore};
use license_summary::summary::SECONDS_PER_DAY;
use license_summary::LicenseError;

const NOW: i64 = 1_760_000_000;

#[tokio::test]
async fn refresh_updates_every_record_in_one_batch() {
    let store = MemoryStore::with_data(json!({
        "licenses": {
            "u1": {"active": true, "expiresAt": NOW + 864_000},
            "u2": {"active": false, "expiresAt": NOW + 864_000},
        }
    }));

    let report = run_summary_refresh_at(&store, "licenses", NOW)
        .await
        .expect("refresh failed");

    assert_eq!(
        report,
        RefreshReport {
            records: 2,
            fields: 6,
            written: true
        }
    );
    assert_eq!(store.write_count(), 1);

    let u1 = store.read("licenses/u1").await.unwrap().unwrap();
    assert_eq!(u1["expired"], json!(false));
    assert_eq!(u1["daysRemaining"], json!(10));
    assert!(u1["lastComputedAt"].is_i64());

    let u2 = store.read("licenses/u2").await.unwrap().unwrap();
    assert_eq!(u2["expired"], json!(true));
    assert_eq!(u2["daysRemaining"], json!(10));
    assert_eq!(u1["lastComputedAt"], u2["lastComputedAt"]);
}

#[tokio::test]
async fn refresh_of_empty_collection_writes_nothing() {
    let store = MemoryStore::new();

    let report = run_summary_refresh(&store, "licenses").await.unwrap();
    assert_eq!(report, RefreshReport::default());
    assert!(!report.written);
    assert_eq!(store.write_count(), 0);

    store.set("licenses", json!({})).await.unwrap();
    run_summary_refresh(&store, "licenses").await.unwrap();
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn refresh_touches_three_fields_per_record() {
    let mut records = serde_json::Map::new();
    for i in 0..25 {
        records.insert(
            format!("user-{i}"),
            json!({"active": i % 2 == 0, "expiresAt": NOW + i * SECONDS_PER_DAY}),
        );
    }
    let store = MemoryStore::with_data(json!({"licenses": records}));

    let report = run_summary_refresh_at(&store, "licenses", NOW).await.unwrap();
    assert_eq!(report.records, 25);
    assert_eq!(report.fields, 75);
    assert_eq!(store.write_count(), 1);

    let r4 = store.read("licenses/user-4").await.unwrap().unwrap();
    assert_eq!(r4["expired"], json!(false));
    assert_eq!(r4["daysRemaining"], json!(4));

    let r3 = store.read("licenses/user-3").await.unwrap().unwrap();
    assert_eq!(r3["expired"], json!(true));
}

#[tokio::test]
async fn refresh_reflects_passage_of_time() {
    let store = MemoryStore::with_data(json!({
        "licenses": {"u1": {"active": true, "expiresAt": NOW + 2 * SECONDS_PER_DAY}}
    }));

    run_summary_refresh_at(&store, "licenses", NOW).await.unwrap();
    assert_eq!(
        store.read("licenses/u1/expired").await.unwrap(),
        Some(json!(false))
    );

    // Nobody edits the record; three days later the refresh catches up.
    run_summary_refresh_at(&store, "licenses", NOW + 3 * SECONDS_PER_DAY)
        .await
        .unwrap();
    let u1 = store.read("licenses/u1").await.unwrap().unwrap();
    assert_eq!(u1["expired"], json!(true));
    assert_eq!(u1["daysRemaining"], json!(0));
}

#[tokio::test]
async fn refresh_leaves_other_collections_alone() {
    let store = MemoryStore::with_data(json!({
        "licenses": {"u1": {"active": true, "expiresAt": NOW + SECONDS_PER_DAY}},
        "sessions": {"u1": {"lastHeartbeat": NOW}},
    }));

    run_summary_refresh_at(&store, "licenses", NOW).await.unwrap();

    let sessions = store.read("sessions").await.unwrap().unwrap();
    assert_eq!(sessions, json!({"u1": {"lastHeartbeat": NOW}}));
}

#[tokio::test]
async fn read_failure_propagates() {
    let store = MemoryStore::with_data(json!({"licenses": {"u1": {"active": true}}}));
    store.fail_reads(true);

    let err = run_summary_refresh_at(&store, "licenses", NOW)
        .await
        .unwrap_err();
    assert!(matches!(err, LicenseError::StoreError(_)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn write_failure_propagates_without_partial_writes() {
    let store = MemoryStore::with_data(json!({
        "licenses": {
            "u1": {"active": true, "expiresAt": NOW + SECONDS_PER_DAY},
            "u2": {"active": true, "expiresAt": NOW + SECONDS_PER_DAY},
        }
    }));
    store.fail_writes(true);

    let err = run_summary_refresh_at(&store, "licenses", NOW)
        .await
        .unwrap_err();
    assert!(matches!(err, LicenseError::StoreError(_)));

    let u1 = store.read("licenses/u1").await.unwrap().unwrap();
    assert!(u1.get("expired").is_none());
}
