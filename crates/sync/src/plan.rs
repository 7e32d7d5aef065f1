//! One synchronization pass.
//!
//! A pass refreshes the collection catalog, walks the package listing of
//! every configured collection, the granule listing of every configured
//! package, and finally serves the configured search through the cache. A
//! failed run is recorded and the pass moves on to the next one.

use chrono::{DateTime, Utc};

use govsync_core::config::ConfigError;
use govsync_core::models::PackageWindow;
use govsync_core::{AppConfig, CatalogDb, Error, IngestOptions, Ingestor, Transport, cached_search};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchStep {
    pub query: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub windows: Vec<PackageWindow>,
    pub granule_packages: Vec<String>,
    pub options: IngestOptions,
    pub search: Option<SearchStep>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub collections: usize,
    pub packages: usize,
    pub granules: usize,
    pub search_results: Option<i64>,
    pub failures: Vec<String>,
}

impl SyncPlan {
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a listing window is out of range.
    pub fn from_config(config: &AppConfig, now: DateTime<Utc>) -> Result<Self, ConfigError> {
        Ok(Self {
            windows: config
                .collections
                .iter()
                .map(|code| config.window_for(code, now))
                .collect::<Result<_, _>>()?,
            granule_packages: config.granule_packages.clone(),
            options: config.ingest_options(),
            search: config
                .search_query
                .as_ref()
                .filter(|q| !q.trim().is_empty())
                .map(|query| SearchStep { query: query.clone(), ttl_hours: config.search_ttl_hours }),
        })
    }

    /// Execute the pass.
    ///
    /// # Errors
    ///
    /// Only a failed collection refresh or a store failure outside a run
    /// aborts the pass; per-run failures land in [`SyncReport::failures`].
    pub async fn run<T: Transport + ?Sized>(&self, db: &CatalogDb, transport: &T) -> Result<SyncReport, Error> {
        let mut report = SyncReport::default();

        let purged = db.purge_expired_search().await?;
        if purged > 0 {
            tracing::debug!(purged, "expired search entries removed");
        }

        let ingestor = Ingestor::new(db, transport);
        report.collections = ingestor.ingest_collections().await?;

        for window in &self.windows {
            match ingestor.ingest_collection_packages(window, &self.options).await {
                Ok(count) => report.packages += count,
                Err(e) => {
                    tracing::error!(collection = %window.collection_code, error = %e, "package run failed");
                    report.failures.push(format!("{}: {e}", window.collection_code));
                }
            }
        }

        for package_id in &self.granule_packages {
            match ingestor.ingest_package_granules(package_id, &self.options).await {
                Ok(count) => report.granules += count,
                Err(e) => {
                    tracing::error!(package_id = %package_id, error = %e, "granule run failed");
                    report.failures.push(format!("{package_id}: {e}"));
                }
            }
        }

        if let Some(step) = &self.search {
            match cached_search(db, transport, &step.query, self.options.page_size, step.ttl_hours).await {
                Ok(entry) => report.search_results = Some(entry.result_count),
                Err(e) => {
                    tracing::error!(query = %step.query, error = %e, "search failed");
                    report.failures.push(format!("search '{}': {e}", step.query));
                }
            }
        }

        Ok(report)
    }
}
