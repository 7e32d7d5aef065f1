//! govsync entry point.
//!
//! Loads layered configuration, opens the catalog database and runs one
//! synchronization pass against the GovInfo API.
//! Logging goes to stderr as JSON.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use govsync_client::{GovInfoClient, GovInfoConfig};
use govsync_core::{AppConfig, CatalogDb};

mod plan;

use plan::SyncPlan;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(db_path = %config.db_path.display(), "starting govsync");

    let db = CatalogDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening catalog at {}", config.db_path.display()))?;
    let client = GovInfoClient::new(GovInfoConfig::from_app_config(&config)?)?;

    let plan = SyncPlan::from_config(&config, Utc::now()).context("building sync plan")?;
    let report = plan.run(&db, &client).await?;

    tracing::info!(
        collections = report.collections,
        packages = report.packages,
        granules = report.granules,
        search_results = ?report.search_results,
        failures = report.failures.len(),
        "sync finished"
    );

    if !report.failures.is_empty() {
        bail!("{} run(s) failed: {}", report.failures.len(), report.failures.join("; "));
    }

    Ok(())
}
