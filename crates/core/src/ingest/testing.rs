//! Fixtures and a scripted in-memory transport.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::models::{
    Blob, CollectionInfo, GranuleBasic, GranuleDetail, Page, PackageBasic, PackageDetail, PackageWindow,
};
use crate::transport::{Transport, TransportError};

pub(crate) fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn blob(value: Value) -> Blob {
    value.as_object().cloned().unwrap_or_default()
}

/// Next-page reference carrying `token`.
pub(crate) fn next_ref(token: &str) -> String {
    format!("https://api.govinfo.gov/collections/BILLS/2024-01-01T00:00:00Z?offsetMark={token}&pageSize=100")
}

pub(crate) fn collection(code: &str) -> CollectionInfo {
    CollectionInfo {
        collection_code: code.to_string(),
        collection_name: format!("{code} Collection"),
        package_count: 0,
        granule_count: None,
    }
}

pub(crate) fn package_basic(id: &str, last_modified: &str) -> PackageBasic {
    PackageBasic {
        package_id: id.to_string(),
        last_modified: at(last_modified),
        package_link: Some(format!("https://api.govinfo.gov/packages/{id}/summary")),
    }
}

pub(crate) fn package_detail(id: &str, code: &str, download: Value) -> PackageDetail {
    PackageDetail {
        package_id: id.to_string(),
        title: Some(format!("Title of {id}")),
        collection_code: code.to_string(),
        collection_name: Some(format!("{code} Collection")),
        category: Some("Bills and Statutes".into()),
        date_issued: Some("2024-01-01".into()),
        last_modified: None,
        branch: Some("legislative".into()),
        congress: Some("118".into()),
        session: Some("2".into()),
        download: Some(blob(download)),
        related: None,
        references: None,
        extra: blob(json!({"billType": "hr", "pages": "12"})),
    }
}

pub(crate) fn granule_basic(id: &str) -> GranuleBasic {
    GranuleBasic {
        granule_id: id.to_string(),
        title: Some("Section".into()),
        granule_link: Some(format!("https://api.govinfo.gov/granules/{id}/summary")),
        granule_class: Some("HOUSE".into()),
        last_modified: None,
    }
}

pub(crate) fn granule_detail(id: &str, package_id: &str) -> GranuleDetail {
    GranuleDetail {
        granule_id: id.to_string(),
        title: Some("House Section".into()),
        package_id: package_id.to_string(),
        granule_class: Some("HOUSE".into()),
        collection_code: Some("CREC".into()),
        date_issued: Some("2024-01-03".into()),
        last_modified: None,
        download: Some(blob(json!({"txtLink": format!("https://api.govinfo.gov/granules/{id}/htm")}))),
        extra: blob(json!({"pages": "H1-H20"})),
    }
}

/// Transport answering from scripted pages keyed by cursor.
///
/// Unscripted cursors, details and searches fail with a 500.
#[derive(Default)]
pub(crate) struct FakeTransport {
    collections: Vec<CollectionInfo>,
    package_pages: HashMap<String, Page<PackageBasic>>,
    package_details: HashMap<String, PackageDetail>,
    granule_pages: HashMap<String, Page<GranuleBasic>>,
    granule_details: HashMap<String, GranuleDetail>,
    failing_cursors: HashSet<String>,
    search_payload: Option<Value>,
    listed: Mutex<Vec<String>>,
    detail_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl FakeTransport {
    pub(crate) fn with_collections(mut self, collections: Vec<CollectionInfo>) -> Self {
        self.collections = collections;
        self
    }

    pub(crate) fn with_package_page(mut self, cursor: &str, records: Vec<PackageBasic>, next: Option<String>) -> Self {
        self.package_pages.insert(cursor.to_string(), Page::new(records, next));
        self
    }

    pub(crate) fn with_package_detail(mut self, detail: PackageDetail) -> Self {
        self.package_details.insert(detail.package_id.clone(), detail);
        self
    }

    pub(crate) fn with_granule_page(mut self, cursor: &str, records: Vec<GranuleBasic>, next: Option<String>) -> Self {
        self.granule_pages.insert(cursor.to_string(), Page::new(records, next));
        self
    }

    pub(crate) fn with_granule_detail(mut self, detail: GranuleDetail) -> Self {
        self.granule_details.insert(detail.granule_id.clone(), detail);
        self
    }

    /// Fail any listing request for `cursor`, whether or not it is scripted.
    pub(crate) fn failing_packages_at(mut self, cursor: &str) -> Self {
        self.failing_cursors.insert(cursor.to_string());
        self
    }

    pub(crate) fn with_search(mut self, payload: Value) -> Self {
        self.search_payload = Some(payload);
        self
    }

    /// Cursors requested from either listing, in order.
    pub(crate) fn listed_cursors(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }

    pub(crate) fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn page<T: Clone>(&self, pages: &HashMap<String, Page<T>>, cursor: &str) -> Result<Page<T>, TransportError> {
        self.listed.lock().unwrap().push(cursor.to_string());
        if self.failing_cursors.contains(cursor) {
            return Err(TransportError::Http { status: 503 });
        }
        pages.get(cursor).cloned().ok_or(TransportError::Http { status: 500 })
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, TransportError> {
        Ok(self.collections.clone())
    }

    async fn fetch_packages(
        &self, _window: &PackageWindow, cursor: &str, _page_size: u32,
    ) -> Result<Page<PackageBasic>, TransportError> {
        self.page(&self.package_pages, cursor)
    }

    async fn fetch_package_detail(&self, package_id: &str) -> Result<PackageDetail, TransportError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.package_details.get(package_id).cloned().ok_or(TransportError::Http { status: 500 })
    }

    async fn fetch_granules(
        &self, _package_id: &str, cursor: &str, _page_size: u32,
    ) -> Result<Page<GranuleBasic>, TransportError> {
        self.page(&self.granule_pages, cursor)
    }

    async fn fetch_granule_detail(&self, _package_id: &str, granule_id: &str) -> Result<GranuleDetail, TransportError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.granule_details.get(granule_id).cloned().ok_or(TransportError::Http { status: 500 })
    }

    async fn search(&self, _query: &str, _page_size: u32) -> Result<Value, TransportError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_payload.clone().ok_or(TransportError::Http { status: 500 })
    }
}
