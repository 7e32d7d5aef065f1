//! Remote catalog transport.
//!
//! The engine never talks HTTP itself: it drives an implementation of
//! [`Transport`] (the GovInfo client in production, scripted fakes in tests)
//! and reacts to its failures.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{CollectionInfo, GranuleBasic, GranuleDetail, Page, PackageBasic, PackageDetail, PackageWindow};

/// Failures reported by a transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// No API key configured for the remote service.
    #[error("missing API key")]
    MissingApiKey,

    /// Authentication rejected by the remote service.
    #[error("authentication failed")]
    Auth,

    /// Rate limited by the remote service.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// Non-success HTTP status.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Remote catalog operations consumed by the ingestion engine.
///
/// Every call is a suspension point; implementations own timeouts and any
/// retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// All collections, returned in one response.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, TransportError>;

    /// One page of packages modified within the window, starting at `cursor`.
    async fn fetch_packages(
        &self, window: &PackageWindow, cursor: &str, page_size: u32,
    ) -> Result<Page<PackageBasic>, TransportError>;

    /// Full summary for one package.
    async fn fetch_package_detail(&self, package_id: &str) -> Result<PackageDetail, TransportError>;

    /// One page of granules within a package, starting at `cursor`.
    async fn fetch_granules(
        &self, package_id: &str, cursor: &str, page_size: u32,
    ) -> Result<Page<GranuleBasic>, TransportError>;

    /// Full summary for one granule.
    async fn fetch_granule_detail(&self, package_id: &str, granule_id: &str) -> Result<GranuleDetail, TransportError>;

    /// Raw result payload of a full-text search.
    async fn search(&self, query: &str, page_size: u32) -> Result<Value, TransportError>;
}
