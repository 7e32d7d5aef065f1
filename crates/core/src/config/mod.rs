//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (GOVSYNC_*)
//! 2. TOML config file (if GOVSYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::ingest::IngestOptions;
use crate::models::{DEFAULT_PAGE_SIZE, PackageWindow};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (GOVSYNC_*)
/// 2. TOML config file (if GOVSYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// GovInfo API key.
    ///
    /// Set via GOVSYNC_API_KEY environment variable.
    /// Required only once the remote client is built.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the remote catalog API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path to the SQLite catalog database.
    ///
    /// Set via GOVSYNC_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Records requested per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Stop each listing after this many pages.
    #[serde(default)]
    pub max_pages: Option<usize>,

    /// Fetch full detail for every listed record.
    #[serde(default)]
    pub fetch_details: bool,

    /// Collection codes whose packages are synchronized.
    ///
    /// Set via GOVSYNC_COLLECTIONS environment variable.
    #[serde(default)]
    pub collections: Vec<String>,

    /// Size of the modification window, counted back from now.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Package identifiers whose granules are synchronized.
    #[serde(default)]
    pub granule_packages: Vec<String>,

    /// Full-text query to run through the search cache.
    #[serde(default)]
    pub search_query: Option<String>,

    /// Lifetime of cached search results in hours.
    #[serde(default = "default_search_ttl_hours")]
    pub search_ttl_hours: i64,
}

fn default_base_url() -> String {
    "https://api.govinfo.gov".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./govsync.sqlite")
}

fn default_user_agent() -> String {
    "govsync/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_window_days() -> u32 {
    1
}

fn default_search_ttl_hours() -> i64 {
    24
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            page_size: default_page_size(),
            max_pages: None,
            fetch_details: false,
            collections: Vec::new(),
            window_days: default_window_days(),
            granule_packages: Vec::new(),
            search_query: None,
            search_ttl_hours: default_search_ttl_hours(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// List fields use figment's array syntax in the environment, e.g.
    /// `GOVSYNC_COLLECTIONS=[BILLS,FR]`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("GOVSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("GOVSYNC_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the API key is not set.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().filter(|key| !key.is_empty()).ok_or_else(|| ConfigError::Missing {
            field: "api_key".into(),
            hint: "Set GOVSYNC_API_KEY environment variable".into(),
        })
    }

    /// Listing window for one collection, ending now.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `window_days` reaches before the
    /// earliest representable date.
    pub fn window_for(&self, collection_code: &str, now: DateTime<Utc>) -> Result<PackageWindow, ConfigError> {
        chrono::Duration::try_days(i64::from(self.window_days))
            .and_then(|span| now.checked_sub_signed(span))
            .map(|start| PackageWindow::new(collection_code, start))
            .ok_or_else(|| ConfigError::Invalid {
                field: "window_days".into(),
                reason: format!("{} days is out of range", self.window_days),
            })
    }

    /// Run options derived from the paging settings.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            page_size: self.page_size,
            max_pages: self.max_pages,
            fetch_details: self.fetch_details,
            start_cursor: None,
        }
    }
}
