//! Catalog data model.
//!
//! Two families of types live here: records as received from the remote
//! catalog (already validated, deserialized from the wire in camelCase), and
//! rows as stored locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema-free structured map used for download links, related links and
/// collection-specific metadata.
pub type Blob = serde_json::Map<String, Value>;

/// Drop `null` members from a blob, returning `None` when nothing remains.
///
/// Stored blobs never carry null keys, so a replaced blob cannot leak a
/// stale key whose value happened to be null.
pub fn compact_blob(blob: &Blob) -> Option<Blob> {
    let compacted: Blob = blob
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if compacted.is_empty() { None } else { Some(compacted) }
}

/// Collection descriptor from the remote `/collections` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub collection_code: String,
    pub collection_name: String,
    pub package_count: i64,
    #[serde(default)]
    pub granule_count: Option<i64>,
}

/// Basic package record from a collection listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageBasic {
    pub package_id: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub package_link: Option<String>,
}

/// Full package summary from `/packages/{id}/summary`.
///
/// Fields not modeled individually are collected into `extra` and stored as
/// the package's metadata blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetail {
    pub package_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub collection_code: String,
    #[serde(default)]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date_issued: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub congress: Option<String>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub download: Option<Blob>,
    #[serde(default)]
    pub related: Option<Blob>,
    #[serde(default)]
    pub references: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Blob,
}

/// Basic granule record from a package's granule listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GranuleBasic {
    pub granule_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub granule_link: Option<String>,
    #[serde(default)]
    pub granule_class: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Full granule summary from `/packages/{id}/granules/{granuleId}/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GranuleDetail {
    pub granule_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub package_id: String,
    #[serde(default)]
    pub granule_class: Option<String>,
    #[serde(default)]
    pub collection_code: Option<String>,
    #[serde(default)]
    pub date_issued: Option<String>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub download: Option<Blob>,
    #[serde(flatten)]
    pub extra: Blob,
}

/// A record headed for the reconciler: either what a listing page carried or
/// the full detail payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageRecord {
    Basic(PackageBasic),
    Full(PackageDetail),
}

impl PackageRecord {
    pub fn package_id(&self) -> &str {
        match self {
            PackageRecord::Basic(b) => &b.package_id,
            PackageRecord::Full(d) => &d.package_id,
        }
    }
}

/// Granule counterpart of [`PackageRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum GranuleRecord {
    Basic(GranuleBasic),
    Full(GranuleDetail),
}

impl GranuleRecord {
    pub fn granule_id(&self) -> &str {
        match self {
            GranuleRecord::Basic(b) => &b.granule_id,
            GranuleRecord::Full(d) => &d.granule_id,
        }
    }
}

/// One page of a paginated remote listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Reference to the next page; carries the continuation token.
    pub next_page: Option<String>,
    /// Total count reported by the remote source, if any.
    pub count: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, next_page: Option<String>) -> Self {
        Self { records, next_page, count: None }
    }
}

/// Collection + modification-time window for a package listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageWindow {
    pub collection_code: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl PackageWindow {
    pub fn new(collection_code: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self { collection_code: collection_code.into(), start, end: None }
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }
}

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Stored collection row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: i64,
    pub collection_code: String,
    pub collection_name: String,
    pub package_count: i64,
    pub granule_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored package row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    pub id: i64,
    pub package_id: String,
    pub title: Option<String>,
    pub collection_id: i64,
    pub collection_code: String,
    pub collection_name: Option<String>,
    pub category: Option<String>,
    pub date_issued: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub branch: Option<String>,
    pub congress: Option<String>,
    pub session: Option<String>,
    pub download_links: Option<Blob>,
    pub related_links: Option<Blob>,
    pub references: Option<Vec<Value>>,
    pub metadata: Option<Blob>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored granule row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Granule {
    pub id: i64,
    pub granule_id: String,
    pub title: Option<String>,
    pub package_row_id: i64,
    pub package_id: String,
    pub granule_class: Option<String>,
    pub collection_code: Option<String>,
    pub date_issued: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub download_links: Option<Blob>,
    pub metadata: Option<Blob>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Memoized search result for one query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchCacheEntry {
    pub query_hash: String,
    pub query: String,
    pub results: Value,
    pub result_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SearchCacheEntry {
    /// An entry is logically absent once `now` has reached its expiry.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
