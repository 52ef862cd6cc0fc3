//! Background jobs for summary maintenance.
//!
//! # Available Jobs
//!
//! - **Summary Refresh**: recomputes `expired` / `daysRemaining` for every license
//!   so that summaries track the passage of time between edits
//!
//! The refresh itself ([`run_summary_refresh`]) is always available. The cron
//! scheduler that drives it requires the `background-jobs` feature.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use license_summary::config::RefreshConfig;
//! use license_summary::jobs::JobScheduler;
//! use license_summary::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut scheduler = JobScheduler::new(store, "licenses", RefreshConfig::default()).await?;
//! scheduler.start().await?;
//! ```

mod refresh;

#[cfg(feature = "background-jobs")]
mod scheduler;

pub use refresh::{run_summary_refresh, run_summary_refresh_at, stage_refresh, RefreshReport};

#[cfg(feature = "background-jobs")]
pub use scheduler::JobScheduler;
