use std::sync::Arc;

use tracing::{error, info};

use license_summary::config::init_config;
use license_summary::errors::LicenseResult;
use license_summary::jobs::JobScheduler;
use license_summary::logging::init_logging;
use license_summary::store::{LicenseStore, MemoryStore, SqliteStore};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("License summary worker failed: {e}");
        eprintln!("license_summary_worker: {e}");
        std::process::exit(1);
    }
}

async fn run() -> LicenseResult<()> {
    let config = init_config()?;
    init_logging(&config.logging)?;

    let store: Arc<dyn LicenseStore> = match config.store.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        _ => Arc::new(SqliteStore::connect(&config.store.sqlite_url).await?),
    };
    info!(
        backend = %config.store.backend,
        collection = %config.store.collection,
        "License store ready"
    );

    let mut scheduler =
        JobScheduler::new(store, config.store.collection.clone(), config.refresh.clone()).await?;
    scheduler.start().await?;

    // Bring summaries up to date now instead of waiting for the first tick.
    if config.refresh.enabled {
        let report = scheduler.run_summary_refresh_now().await?;
        info!(records = report.records, "Initial summary refresh done");
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Unable to listen for shutdown signal: {e}"),
    }

    scheduler.shutdown().await
}
