//! License store abstraction.
//!
//! The store is a hierarchical JSON document tree addressed by `/`-separated
//! paths (`licenses/<id>/<field>`). It supports snapshot reads, targeted field
//! updates, atomic multi-path updates, and a server-assigned timestamp sentinel.
//!
//! - `memory` → in-process tree, used by tests and embedders
//! - `sqlite` → one JSON document per record in SQLite (requires `sqlite` feature)

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::LicenseResult;
use crate::validation::split_path;

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// A value to write at a path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    /// Replaced by the store with its own clock (epoch millis) at write time.
    ServerTimestamp,
}

impl FieldValue {
    /// Resolve the sentinel against the write's timestamp.
    pub fn resolve(self, server_millis: i64) -> Value {
        match self {
            FieldValue::Value(v) => v,
            FieldValue::ServerTimestamp => Value::from(server_millis),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

/// Field name → value, for a targeted update of one location.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A set of path-keyed writes applied as one atomic operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchUpdate {
    updates: BTreeMap<String, FieldValue>,
}

impl BatchUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write. A later write to the same path replaces the earlier one.
    pub fn stage(&mut self, path: impl Into<String>, value: impl Into<FieldValue>) {
        self.updates.insert(path.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.updates.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.updates.keys().map(String::as_str)
    }
}

impl IntoIterator for BatchUpdate {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.into_iter()
    }
}

/// Hierarchical document store holding license records.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    /// Snapshot read of the value at `path`. `None` when nothing is stored there.
    async fn read(&self, path: &str) -> LicenseResult<Option<Value>>;

    /// Apply every staged write atomically.
    async fn multi_update(&self, batch: BatchUpdate) -> LicenseResult<()>;

    /// Write the given fields under `path`, leaving sibling fields untouched.
    async fn update(&self, path: &str, fields: FieldMap) -> LicenseResult<()> {
        let base = path.trim_end_matches('/');
        let mut batch = BatchUpdate::new();
        for (field, value) in fields {
            batch.stage(format!("{base}/{field}"), value);
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.multi_update(batch).await
    }
}

/// Timestamp used to resolve [`FieldValue::ServerTimestamp`].
pub(crate) fn server_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Resolve a batch into validated path segments and concrete values.
pub(crate) fn resolve_batch(batch: BatchUpdate) -> LicenseResult<Vec<(Vec<String>, Value)>> {
    let server_millis = server_timestamp_millis();
    let mut resolved = Vec::with_capacity(batch.len());
    for (path, value) in batch {
        let segments: Vec<String> = split_path(&path)?
            .into_iter()
            .map(str::to_string)
            .collect();
        resolved.push((segments, value.resolve(server_millis)));
    }
    Ok(resolved)
}

/// Look up the value at `segments` below `root`.
pub(crate) fn get_at<'a, S: AsRef<str>>(root: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| {
            let key: &str = segment.as_ref();
            node.get(key)
        })
        .filter(|v| !v.is_null())
}

/// Write `value` at `segments` below `root`, creating intermediate objects.
///
/// Writing `null` removes the key. Non-object nodes on the way are replaced.
pub(crate) fn set_at<S: AsRef<str>>(root: &mut Value, segments: &[S], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        let key: &str = segment.as_ref();
        node = ensure_object(node)
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let key: &str = last.as_ref();
    let map = ensure_object(node);
    if value.is_null() {
        map.remove(key);
    } else {
        map.insert(key.to_string(), value);
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
