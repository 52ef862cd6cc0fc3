//! Integration tests for the SQLite store and both triggers running on it.
//!
//! These tests require the `sqlite` feature to be enabled.

#![cfg(feature = "sqlite")]

use serde_json::json;
use std::sync::Arc;

use license_summary::jobs::run_summary_refresh_at;
use license_summary::reactor::{ChangeReactor, RecordChange};
use license_summary::store::{BatchUpdate, FieldValue, LicenseStore, SqliteStore};
use license_summary::summary::SECONDS_PER_DAY;

const NOW: i64 = 1_760_000_000;

/// Helper to create an in-memory store.
async fn setup_test_store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:")
        .await
        .expect("failed to create store")
}

#[tokio::test]
async fn collection_read_returns_all_records() {
    let store = setup_test_store().await;
    store
        .put_record("licenses", "u1", &json!({"active": true}))
        .await
        .unwrap();
    store
        .put_record("licenses", "u2", &json!({"active": false}))
        .await
        .unwrap();
    store
        .put_record("sessions", "u1", &json!({"deviceId": "abc"}))
        .await
        .unwrap();

    let licenses = store.read("licenses").await.unwrap().unwrap();
    assert_eq!(
        licenses,
        json!({"u1": {"active": true}, "u2": {"active": false}})
    );
    assert!(store.read("tenants").await.unwrap().is_none());
}

#[tokio::test]
async fn multi_update_spans_records_atomically() {
    let store = setup_test_store().await;
    store
        .put_record("licenses", "u1", &json!({"active": true, "plan": "pro"}))
        .await
        .unwrap();

    let mut batch = BatchUpdate::new();
    batch.stage("licenses/u1/expired", json!(false));
    batch.stage("licenses/u1/lastComputedAt", FieldValue::ServerTimestamp);
    batch.stage("licenses/u2/expired", json!(true));
    store.multi_update(batch).await.unwrap();

    let u1 = store.read("licenses/u1").await.unwrap().unwrap();
    assert_eq!(u1["plan"], json!("pro"));
    assert_eq!(u1["expired"], json!(false));
    assert!(u1["lastComputedAt"].is_i64());

    let u2 = store.read("licenses/u2").await.unwrap().unwrap();
    assert_eq!(u2, json!({"expired": true}));
}

#[tokio::test]
async fn rejected_batch_writes_nothing() {
    let store = setup_test_store().await;
    store
        .put_record("licenses", "u1", &json!({"active": true}))
        .await
        .unwrap();

    let mut batch = BatchUpdate::new();
    batch.stage("licenses/u1/expired", json!(false));
    batch.stage("licenses/u[1]/expired", json!(false));
    assert!(store.multi_update(batch).await.is_err());

    let u1 = store.read("licenses/u1").await.unwrap().unwrap();
    assert_eq!(u1, json!({"active": true}));
}

#[tokio::test]
async fn null_write_removes_field() {
    let store = setup_test_store().await;
    store
        .put_record("licenses", "u1", &json!({"active": true, "notes": "trial"}))
        .await
        .unwrap();

    let mut batch = BatchUpdate::new();
    batch.stage("licenses/u1/notes", serde_json::Value::Null);
    store.multi_update(batch).await.unwrap();

    assert!(store.read("licenses/u1/notes").await.unwrap().is_none());
}

#[tokio::test]
async fn reactor_and_refresh_on_sqlite() {
    let store = Arc::new(setup_test_store().await);
    let doc = json!({"active": true, "expiresAt": (NOW + 7 * SECONDS_PER_DAY) * 1000});
    store.put_record("licenses", "u1", &doc).await.unwrap();
    store
        .put_record("licenses", "u2", &json!({"active": 0, "expiresAt": NOW}))
        .await
        .unwrap();

    let reactor = ChangeReactor::new(Arc::clone(&store), "licenses");
    reactor
        .on_write_at("u1", &RecordChange::new(None, Some(doc)), NOW)
        .await
        .unwrap();
    assert_eq!(
        store.read("licenses/u1/daysRemaining").await.unwrap(),
        Some(json!(7))
    );

    let report = run_summary_refresh_at(&*store, "licenses", NOW + SECONDS_PER_DAY)
        .await
        .unwrap();
    assert_eq!(report.records, 2);

    let u1 = store.read("licenses/u1").await.unwrap().unwrap();
    assert_eq!(u1["daysRemaining"], json!(6));
    let u2 = store.read("licenses/u2").await.unwrap().unwrap();
    assert_eq!(u2["expired"], json!(true));
    assert_eq!(u2["daysRemaining"], json!(0));
}
