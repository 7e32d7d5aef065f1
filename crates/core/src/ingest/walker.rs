//! Cursor-based pagination over remote listings.
//!
//! Every listing starts at the sentinel cursor [`FIRST_CURSOR`]. Each page
//! may carry a reference to the next page; the continuation token is the
//! `offsetMark` query parameter of that reference. A page without a usable
//! token is the last one.

use async_trait::async_trait;
use url::{Url, form_urlencoded};

use crate::models::{GranuleBasic, Page, PackageBasic, PackageWindow};
use crate::transport::{Transport, TransportError};

/// Cursor requesting the first page of a listing.
pub const FIRST_CURSOR: &str = "*";

/// Query parameter carrying the continuation token.
pub const CONTINUATION_PARAM: &str = "offsetMark";

/// Extract the continuation token from a next-page reference.
///
/// Accepts absolute URLs, relative references and bare query strings. The
/// token is percent-decoded. Returns `None` when the parameter is missing or
/// empty.
pub fn continuation_token(reference: &str) -> Option<String> {
    let query = match Url::parse(reference) {
        Ok(url) => url.query()?.to_string(),
        Err(_) => {
            let query = reference.split_once('?').map_or(reference, |(_, q)| q);
            query.split('#').next().unwrap_or(query).to_string()
        }
    };

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == CONTINUATION_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
}

/// A paginated remote listing.
#[async_trait]
pub trait Listing: Send + Sync {
    type Record: Send;

    async fn fetch(&self, cursor: &str) -> Result<Page<Self::Record>, TransportError>;
}

/// Packages of one collection modified within a window.
pub struct PackageListing<'a, T: ?Sized> {
    transport: &'a T,
    window: PackageWindow,
    page_size: u32,
}

impl<'a, T: Transport + ?Sized> PackageListing<'a, T> {
    pub fn new(transport: &'a T, window: PackageWindow, page_size: u32) -> Self {
        Self { transport, window, page_size }
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Listing for PackageListing<'_, T> {
    type Record = PackageBasic;

    async fn fetch(&self, cursor: &str) -> Result<Page<PackageBasic>, TransportError> {
        self.transport.fetch_packages(&self.window, cursor, self.page_size).await
    }
}

/// Granules of one package.
pub struct GranuleListing<'a, T: ?Sized> {
    transport: &'a T,
    package_id: String,
    page_size: u32,
}

impl<'a, T: Transport + ?Sized> GranuleListing<'a, T> {
    pub fn new(transport: &'a T, package_id: impl Into<String>, page_size: u32) -> Self {
        Self { transport, package_id: package_id.into(), page_size }
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Listing for GranuleListing<'_, T> {
    type Record = GranuleBasic;

    async fn fetch(&self, cursor: &str) -> Result<Page<GranuleBasic>, TransportError> {
        self.transport.fetch_granules(&self.package_id, cursor, self.page_size).await
    }
}

/// Walks a listing one page at a time.
///
/// Holds the cursor for the next request. A failed fetch leaves the cursor
/// in place so the same page can be requested again.
pub struct CursorWalker<L> {
    listing: L,
    cursor: Option<String>,
    pages: usize,
}

impl<L: Listing> CursorWalker<L> {
    pub fn new(listing: L) -> Self {
        Self::resume_at(listing, FIRST_CURSOR)
    }

    /// Start from a previously observed continuation token.
    pub fn resume_at(listing: L, cursor: impl Into<String>) -> Self {
        Self { listing, cursor: Some(cursor.into()), pages: 0 }
    }

    /// Cursor of the next page, `None` once the listing is exhausted.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    /// Fetch the next page, or `None` when there is none.
    pub async fn next_page(&mut self) -> Result<Option<Page<L::Record>>, TransportError> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };

        match self.listing.fetch(&cursor).await {
            Ok(page) => {
                self.pages += 1;
                self.cursor = page.next_page.as_deref().and_then(continuation_token);
                tracing::trace!(cursor = %cursor, records = page.records.len(), next = ?self.cursor, "page fetched");
                Ok(Some(page))
            }
            Err(e) => {
                self.cursor = Some(cursor);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::{FakeTransport, next_ref, package_basic};
    use chrono::{TimeZone, Utc};

    fn window() -> PackageWindow {
        PackageWindow::new("BILLS", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_token_from_absolute_url() {
        let reference = "https://api.govinfo.gov/collections/BILLS/2024-01-01T00:00:00Z?pageSize=100&offsetMark=AoJ%2Bx";
        assert_eq!(continuation_token(reference).as_deref(), Some("AoJ+x"));
    }

    #[test]
    fn test_token_from_relative_reference() {
        assert_eq!(continuation_token("/collections/FR?offsetMark=abc&pageSize=10").as_deref(), Some("abc"));
        assert_eq!(continuation_token("offsetMark=abc").as_deref(), Some("abc"));
    }

    #[test]
    fn test_token_missing_or_empty() {
        assert_eq!(continuation_token("https://api.govinfo.gov/collections/BILLS?pageSize=100"), None);
        assert_eq!(continuation_token("https://api.govinfo.gov/collections/BILLS"), None);
        assert_eq!(continuation_token("https://api.govinfo.gov/collections/BILLS?offsetMark="), None);
        assert_eq!(continuation_token(""), None);
        assert_eq!(continuation_token("not a url at all"), None);
    }

    #[tokio::test]
    async fn test_walk_stops_after_last_page() {
        let transport = FakeTransport::default()
            .with_package_page("*", vec![package_basic("A", "2024-01-01T00:00:00Z")], Some(next_ref("p2")))
            .with_package_page("p2", vec![package_basic("B", "2024-01-01T00:00:00Z")], Some(next_ref("p3")))
            .with_package_page(
                "p3",
                vec![package_basic("C", "2024-01-01T00:00:00Z")],
                Some("https://api.govinfo.gov/collections/BILLS?pageSize=100".into()),
            );
        let mut walker = CursorWalker::new(PackageListing::new(&transport, window(), 100));

        let mut ids = Vec::new();
        while let Some(page) = walker.next_page().await.unwrap() {
            ids.extend(page.records.into_iter().map(|r| r.package_id));
        }

        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(walker.pages_fetched(), 3);
        assert!(walker.is_exhausted());
        assert_eq!(transport.listed_cursors(), vec!["*", "p2", "p3"]);
        assert!(walker.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_cursor() {
        let transport = FakeTransport::default()
            .with_package_page("*", vec![package_basic("A", "2024-01-01T00:00:00Z")], Some(next_ref("p2")))
            .failing_packages_at("p2");
        let mut walker = CursorWalker::new(PackageListing::new(&transport, window(), 100));

        assert!(walker.next_page().await.unwrap().is_some());
        assert!(walker.next_page().await.is_err());
        assert_eq!(walker.cursor(), Some("p2"));
        assert_eq!(walker.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_resume_at_cursor() {
        let transport = FakeTransport::default()
            .with_package_page("p2", vec![package_basic("B", "2024-01-01T00:00:00Z")], None);
        let mut walker = CursorWalker::resume_at(PackageListing::new(&transport, window(), 100), "p2");

        let page = walker.next_page().await.unwrap().unwrap();
        assert_eq!(page.records[0].package_id, "B");
        assert_eq!(transport.listed_cursors(), vec!["p2"]);
    }
}
