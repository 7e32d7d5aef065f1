//! GovInfo API client.
//!
//! Provides a client for the GovInfo REST API with rate limiting and
//! response decoding into core record types.
//!
//! ### API
//!
//! - **Endpoint**: `https://api.govinfo.gov`
//! - **Authentication**: `X-Api-Key` header (api.data.gov key). The key
//!   never appears in a request URL.
//! - **Rate Limiting**: a minimum interval between consecutive requests. No
//!   retries; failures surface to the caller.

pub mod error;
pub mod request;
pub mod response;

pub use error::GovInfoError;
pub use request::{Endpoints, PublishedFilter, SearchRequest, format_timestamp};
pub use response::{CollectionsEnvelope, GranulesEnvelope, PackagesEnvelope};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

use govsync_core::models::{CollectionInfo, GranuleBasic, GranuleDetail, Page, PackageBasic, PackageDetail, PackageWindow};
use govsync_core::{AppConfig, Transport, TransportError};

/// Default base URL for the GovInfo API.
const DEFAULT_BASE_URL: &str = "https://api.govinfo.gov";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "govsync/0.1";

/// api.data.gov key header.
const API_KEY_HEADER: &str = "X-Api-Key";

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// GovInfo client configuration.
#[derive(Debug, Clone)]
pub struct GovInfoConfig {
    pub api_key: String,
    /// Base URL (default: https://api.govinfo.gov).
    pub base_url: String,
    /// Request timeout (default: 30s).
    pub timeout: Duration,
    pub user_agent: String,
    /// Minimum spacing of consecutive requests.
    pub min_interval: Duration,
}

impl Default for GovInfoConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_interval: MIN_REQUEST_INTERVAL,
        }
    }
}

impl GovInfoConfig {
    /// Build from application configuration.
    ///
    /// Returns `GovInfoError::MissingApiKey` if no key is configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, GovInfoError> {
        let api_key = config.require_api_key().map_err(|_| GovInfoError::MissingApiKey)?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            ..Default::default()
        })
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// GovInfo API client.
#[derive(Debug, Clone)]
pub struct GovInfoClient {
    http: reqwest::Client,
    config: GovInfoConfig,
    endpoints: Endpoints,
    rate_limiter: Arc<RateLimiter>,
}

impl GovInfoClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GovInfoConfig) -> Result<Self, GovInfoError> {
        if config.api_key.is_empty() {
            return Err(GovInfoError::MissingApiKey);
        }

        let endpoints = Endpoints::new(&config.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let rate_limiter = Arc::new(RateLimiter::new(config.min_interval));

        Ok(Self { http, config, endpoints, rate_limiter })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GovInfoError> {
        self.rate_limiter.acquire().await;
        tracing::debug!(url = %url, "GET");

        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        Self::read(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, url: Url, body: &impl serde::Serialize) -> Result<T, GovInfoError> {
        self.rate_limiter.acquire().await;
        tracing::debug!(url = %url, "POST");

        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GovInfoError> {
        let status = response.status();
        tracing::debug!(%status, "GovInfo API response");
        error::check_status(status)?;

        let bytes = response.bytes().await?;
        self::response::parse(&bytes)
    }

    pub async fn collections(&self) -> Result<Vec<CollectionInfo>, GovInfoError> {
        let envelope: CollectionsEnvelope = self.get_json(self.endpoints.collections()).await?;
        Ok(envelope.collections)
    }

    pub async fn collection_packages(
        &self, window: &PackageWindow, cursor: &str, page_size: u32,
    ) -> Result<Page<PackageBasic>, GovInfoError> {
        let envelope: PackagesEnvelope =
            self.get_json(self.endpoints.collection_packages(window, cursor, page_size)).await?;
        Ok(envelope.into())
    }

    pub async fn package_summary(&self, package_id: &str) -> Result<PackageDetail, GovInfoError> {
        self.get_json(self.endpoints.package_summary(package_id)).await
    }

    pub async fn package_granules(
        &self, package_id: &str, cursor: &str, page_size: u32,
    ) -> Result<Page<GranuleBasic>, GovInfoError> {
        let envelope: GranulesEnvelope =
            self.get_json(self.endpoints.package_granules(package_id, cursor, page_size)).await?;
        Ok(envelope.into())
    }

    pub async fn granule_summary(&self, package_id: &str, granule_id: &str) -> Result<GranuleDetail, GovInfoError> {
        self.get_json(self.endpoints.granule_summary(package_id, granule_id)).await
    }

    /// Execute a full-text search and return the raw result payload.
    pub async fn search(&self, req: &SearchRequest) -> Result<Value, GovInfoError> {
        let start = Instant::now();
        let payload: Value = self.post_json(self.endpoints.search(), req).await?;
        let count = payload.get("count").and_then(serde_json::Value::as_i64).unwrap_or(0);
        tracing::debug!("search completed in {:?}, count={count}", start.elapsed());
        Ok(payload)
    }

    /// Packages by publication date, one page at a time.
    pub async fn published_packages(
        &self, start: NaiveDate, end: Option<NaiveDate>, filter: &PublishedFilter, cursor: &str, page_size: u32,
    ) -> Result<Page<PackageBasic>, GovInfoError> {
        let envelope: PackagesEnvelope =
            self.get_json(self.endpoints.published(start, end, filter, cursor, page_size)).await?;
        Ok(envelope.into())
    }

    /// Documents related to a package, grouped by relationship.
    pub async fn related(&self, package_id: &str) -> Result<Value, GovInfoError> {
        self.get_json(self.endpoints.related(package_id)).await
    }

    /// Related documents of one relationship type (e.g. `BILLS`, `HOB`).
    pub async fn related_by_type(&self, package_id: &str, relationship: &str) -> Result<Value, GovInfoError> {
        self.get_json(self.endpoints.related_by_type(package_id, relationship)).await
    }
}

#[async_trait]
impl Transport for GovInfoClient {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, TransportError> {
        Ok(self.collections().await?)
    }

    async fn fetch_packages(
        &self, window: &PackageWindow, cursor: &str, page_size: u32,
    ) -> Result<Page<PackageBasic>, TransportError> {
        Ok(self.collection_packages(window, cursor, page_size).await?)
    }

    async fn fetch_package_detail(&self, package_id: &str) -> Result<PackageDetail, TransportError> {
        Ok(self.package_summary(package_id).await?)
    }

    async fn fetch_granules(
        &self, package_id: &str, cursor: &str, page_size: u32,
    ) -> Result<Page<GranuleBasic>, TransportError> {
        Ok(self.package_granules(package_id, cursor, page_size).await?)
    }

    async fn fetch_granule_detail(&self, package_id: &str, granule_id: &str) -> Result<GranuleDetail, TransportError> {
        Ok(self.granule_summary(package_id, granule_id).await?)
    }

    async fn search(&self, query: &str, page_size: u32) -> Result<Value, TransportError> {
        Ok(GovInfoClient::search(self, &SearchRequest::new(query, page_size)).await?)
    }
}
