//! Cron-driven scheduling of the summary refresh.

use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler as TokioJobScheduler};
use tracing::{error, info};

use crate::config::RefreshConfig;
use crate::errors::{LicenseError, LicenseResult};
use crate::store::LicenseStore;

use super::refresh::{run_summary_refresh, RefreshReport};

fn scheduler_err(e: impl std::fmt::Display) -> LicenseError {
    LicenseError::SchedulerError(e.to_string())
}

/// Runs the summary refresh on the configured cron schedule.
pub struct JobScheduler {
    scheduler: TokioJobScheduler,
    store: Arc<dyn LicenseStore>,
    collection: String,
    config: RefreshConfig,
}

impl JobScheduler {
    /// Create a new job scheduler.
    pub async fn new(
        store: Arc<dyn LicenseStore>,
        collection: impl Into<String>,
        config: RefreshConfig,
    ) -> LicenseResult<Self> {
        let scheduler = TokioJobScheduler::new().await.map_err(scheduler_err)?;

        Ok(Self {
            scheduler,
            store,
            collection: collection.into(),
            config,
        })
    }

    /// Register the refresh job (when enabled) and start ticking.
    pub async fn start(&self) -> LicenseResult<()> {
        info!("Starting license summary scheduler");

        if self.config.enabled {
            self.add_refresh_job().await?;
        } else {
            info!("Summary refresh disabled; no jobs registered");
        }

        self.scheduler.start().await.map_err(scheduler_err)?;

        info!("License summary scheduler started successfully");

        Ok(())
    }

    /// Stop the job scheduler.
    pub async fn shutdown(&mut self) -> LicenseResult<()> {
        info!("Shutting down license summary scheduler");
        self.scheduler.shutdown().await.map_err(scheduler_err)
    }

    async fn add_refresh_job(&self) -> LicenseResult<()> {
        let store = Arc::clone(&self.store);
        let collection = self.collection.clone();

        let job = Job::new_async(self.config.cron.as_str(), move |_uuid, _l| {
            let store = Arc::clone(&store);
            let collection = collection.clone();
            Box::pin(async move {
                let now = Utc::now().naive_utc();
                info!("Running license summary refresh at {}", now);

                // The next tick is the retry.
                match run_summary_refresh(&*store, &collection).await {
                    Ok(report) => {
                        if report.written {
                            info!(
                                "Summary refresh: {} licenses updated ({} fields)",
                                report.records, report.fields
                            );
                        }
                    }
                    Err(e) => {
                        error!("Summary refresh failed: {}", e);
                    }
                }
            })
        })
        .map_err(scheduler_err)?;

        self.scheduler.add(job).await.map_err(scheduler_err)?;

        info!(
            "Added summary refresh job (schedule: {}, collection: {})",
            self.config.cron, self.collection
        );

        Ok(())
    }

    /// Run the refresh immediately (manual trigger).
    pub async fn run_summary_refresh_now(&self) -> LicenseResult<RefreshReport> {
        run_summary_refresh(&*self.store, &self.collection).await
    }
}
