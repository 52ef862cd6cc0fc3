//! In-memory license store.
//!
//! Holds the whole document tree behind a single `RwLock`, so every multi-path
//! update is applied atomically with respect to readers. Also counts write
//! operations and can be told to fail, which the trigger tests rely on.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::errors::{LicenseError, LicenseResult};
use crate::validation::split_path;

use super::{get_at, resolve_batch, set_at, BatchUpdate, LicenseStore};

#[derive(Debug)]
pub struct MemoryStore {
    root: RwLock<Value>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_data(Value::Object(Map::new()))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose root document is `root`.
    pub fn with_data(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
            writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Overwrite the value at `path` as an external writer would.
    ///
    /// Not counted in [`MemoryStore::write_count`].
    pub async fn set(&self, path: &str, value: Value) -> LicenseResult<()> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        set_at(&mut root, &segments, value);
        Ok(())
    }

    /// Copy of the entire document tree.
    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }

    /// Number of `multi_update` calls that reached the tree.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent reads fail with a store error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail with a store error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LicenseStore for MemoryStore {
    async fn read(&self, path: &str) -> LicenseResult<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            error!(path, "Memory store read rejected");
            return Err(LicenseError::StoreError(format!("read of '{path}' failed")));
        }

        let segments = split_path(path)?;
        let root = self.root.read().await;
        Ok(get_at(&root, &segments).cloned())
    }

    async fn multi_update(&self, batch: BatchUpdate) -> LicenseResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            error!(paths = batch.len(), "Memory store write rejected");
            return Err(LicenseError::StoreError(format!(
                "write of {} paths failed",
                batch.len()
            )));
        }

        let resolved = resolve_batch(batch)?;
        let mut root = self.root.write().await;
        for (segments, value) in &resolved {
            set_at(&mut root, segments, value.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!(paths = resolved.len(), "Applied multi-path update");
        Ok(())
    }
}
