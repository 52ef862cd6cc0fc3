//! License summary - keeps derived expiry fields current on license records
//!
//! Every license record carries two cached fields, `expired` and `daysRemaining`,
//! plus the `lastComputedAt` server timestamp of their last computation. This crate
//! recomputes them in two ways:
//!
//! - [`reactor::ChangeReactor`] - per record, whenever the host reports a write
//! - [`jobs::run_summary_refresh`] - for the whole collection, on a cron schedule
//!
//! Both call the pure [`summary::compute_summary_at`].
//!
//! # Features
//!
//! - `sqlite` - SQLite-backed [`store::SqliteStore`]. Enabled by default.
//! - `background-jobs` - cron scheduler for the periodic refresh. Enabled by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use license_summary::reactor::{ChangeReactor, RecordChange};
//! use license_summary::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let reactor = ChangeReactor::new(store, "licenses");
//! let change = RecordChange::new(None, Some(serde_json::json!({"active": true, "expiresAt": 1_900_000_000})));
//! reactor.on_write("u1", &change).await?;
//! ```

pub mod check;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod logging;
pub mod reactor;
pub mod record;
pub mod store;
pub mod summary;
pub mod validation;

pub use errors::{LicenseError, LicenseResult};
pub use summary::{compute_summary, compute_summary_at, LicenseSummary};
