//! SQLite-backed license store.
//!
//! Each record is one JSON document in the `documents` table, keyed by
//! `(collection, record_id)`. Paths map as `<collection>/<record_id>/<field...>`.
//! A multi-path update runs inside a single transaction.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, error};

use crate::errors::{LicenseError, LicenseResult};
use crate::validation::split_path;

use super::{get_at, resolve_batch, set_at, BatchUpdate, LicenseStore};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_error(op: &str, e: sqlx::Error) -> LicenseError {
    error!("SQLite {op} failed: {e}");
    LicenseError::StoreError(format!("database error: {e}"))
}

fn parse_document(raw: &str) -> LicenseResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| LicenseError::StoreError(format!("corrupt stored document: {e}")))
}

impl SqliteStore {
    /// Connect to `url` and create the schema if needed.
    ///
    /// In-memory databases get a single connection so every query sees the same data.
    pub async fn connect(url: &str) -> LicenseResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| LicenseError::ConfigError(format!("invalid SQLite URL '{url}': {e}")))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if url.contains(":memory:") {
            // The database lives only as long as its one connection.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| db_error("connect", e))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> LicenseResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection  TEXT NOT NULL,
                record_id   TEXT NOT NULL,
                document    TEXT NOT NULL,
                PRIMARY KEY (collection, record_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("migrate", e))?;

        Ok(())
    }

    /// Insert or replace a whole record, as an external writer would.
    pub async fn put_record(
        &self,
        collection: &str,
        record_id: &str,
        doc: &Value,
    ) -> LicenseResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin", e))?;
        save_document(&mut tx, collection, record_id, doc).await?;
        tx.commit().await.map_err(|e| db_error("commit", e))
    }

    async fn read_collection(&self, collection: &str) -> LicenseResult<Option<Value>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT record_id, document FROM documents WHERE collection = ? ORDER BY record_id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("read_collection", e))?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut map = Map::new();
        for (record_id, raw) in rows {
            map.insert(record_id, parse_document(&raw)?);
        }
        Ok(Some(Value::Object(map)))
    }

    async fn read_document(
        &self,
        collection: &str,
        record_id: &str,
    ) -> LicenseResult<Option<Value>> {
        let raw = sqlx::query_scalar::<_, String>(
            "SELECT document FROM documents WHERE collection = ? AND record_id = ?",
        )
        .bind(collection)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("read_document", e))?;

        raw.as_deref().map(parse_document).transpose()
    }
}

async fn load_document(
    tx: &mut Transaction<'_, Sqlite>,
    collection: &str,
    record_id: &str,
) -> LicenseResult<Value> {
    let raw = sqlx::query_scalar::<_, String>(
        "SELECT document FROM documents WHERE collection = ? AND record_id = ?",
    )
    .bind(collection)
    .bind(record_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| db_error("load_document", e))?;

    match raw {
        Some(raw) => parse_document(&raw),
        None => Ok(Value::Object(Map::new())),
    }
}

async fn save_document(
    tx: &mut Transaction<'_, Sqlite>,
    collection: &str,
    record_id: &str,
    doc: &Value,
) -> LicenseResult<()> {
    let empty = match doc {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };

    if empty {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND record_id = ?")
            .bind(collection)
            .bind(record_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| db_error("delete_document", e))?;
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO documents (collection, record_id, document)
        VALUES (?, ?, ?)
        ON CONFLICT(collection, record_id) DO UPDATE SET
            document = excluded.document
        "#,
    )
    .bind(collection)
    .bind(record_id)
    .bind(doc.to_string())
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("save_document", e))?;

    Ok(())
}

#[async_trait]
impl LicenseStore for SqliteStore {
    async fn read(&self, path: &str) -> LicenseResult<Option<Value>> {
        let segments = split_path(path)?;
        match segments.as_slice() {
            [collection] => self.read_collection(collection).await,
            [collection, record_id, rest @ ..] => {
                let doc = self.read_document(collection, record_id).await?;
                Ok(doc.and_then(|doc| get_at(&doc, rest).cloned()))
            }
            [] => Err(LicenseError::InvalidPath(path.to_string())),
        }
    }

    async fn multi_update(&self, batch: BatchUpdate) -> LicenseResult<()> {
        let resolved = resolve_batch(batch)?;

        // (collection, record_id) -> writes below that record
        let mut grouped: BTreeMap<(String, String), Vec<(Vec<String>, Value)>> =
            BTreeMap::new();
        for (mut segments, value) in resolved {
            if segments.len() < 2 {
                return Err(LicenseError::InvalidPath(format!(
                    "'{}' does not address a record",
                    segments.join("/")
                )));
            }
            let rest = segments.split_off(2);
            let record_id = segments.pop().unwrap_or_default();
            let collection = segments.pop().unwrap_or_default();
            grouped
                .entry((collection, record_id))
                .or_default()
                .push((rest, value));
        }

        let mut tx = self.pool.begin().await.map_err(|e| db_error("begin", e))?;
        for ((collection, record_id), writes) in &grouped {
            let mut doc = load_document(&mut tx, collection, record_id).await?;
            for (rest, value) in writes {
                set_at(&mut doc, rest, value.clone());
            }
            save_document(&mut tx, collection, record_id, &doc).await?;
        }
        tx.commit().await.map_err(|e| db_error("commit", e))?;

        debug!(records = grouped.len(), "Applied multi-path update");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn record_round_trip_through_paths() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store
            .put_record("licenses", "u1", &json!({"active": true, "expiresAt": 5}))
            .await
            .unwrap();

        let record = store.read("licenses/u1").await.unwrap().unwrap();
        assert_eq!(record["expiresAt"], json!(5));

        let active = store.read("licenses/u1/active").await.unwrap();
        assert_eq!(active, Some(json!(true)));

        assert!(store.read("licenses/u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn collection_path_requires_record_for_writes() {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        let mut batch = BatchUpdate::new();
        batch.stage("licenses", json!({"u1": {}}));
        assert!(matches!(
            store.multi_update(batch).await,
            Err(LicenseError::InvalidPath(_))
        ));
    }
}
