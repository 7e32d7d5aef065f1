//! GovInfo request construction.
//!
//! URLs built here never carry the API key; the client sends it as a
//! header, so these URLs are safe to log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use url::Url;

use govsync_core::models::PackageWindow;

use super::error::GovInfoError;

/// Timestamp format of the collection listing path.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Optional narrowing of the `/published` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishedFilter {
    /// Collection codes, sent comma-separated. Empty means all collections.
    pub collections: Vec<String>,
    pub doc_class: Option<String>,
    pub congress: Option<u32>,
    pub modified_since: Option<DateTime<Utc>>,
}

/// Builds endpoint URLs under a base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// # Errors
    ///
    /// Returns `GovInfoError::InvalidBaseUrl` if `base_url` does not parse or
    /// cannot carry path segments.
    pub fn new(base_url: &str) -> Result<Self, GovInfoError> {
        let base = Url::parse(base_url).map_err(|e| GovInfoError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(GovInfoError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self { base })
    }

    // Segments are percent-encoded individually.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn paged(&self, segments: &[&str], cursor: &str, page_size: u32) -> Url {
        let mut url = self.url(segments);
        url.query_pairs_mut()
            .append_pair("offsetMark", cursor)
            .append_pair("pageSize", &page_size.to_string());
        url
    }

    pub fn collections(&self) -> Url {
        self.url(&["collections"])
    }

    /// `/collections/{code}/{start}[/{end}]?offsetMark=..&pageSize=..`
    pub fn collection_packages(&self, window: &PackageWindow, cursor: &str, page_size: u32) -> Url {
        let start = format_timestamp(window.start);
        let end = window.end.map(format_timestamp);
        let mut segments = vec!["collections", window.collection_code.as_str(), start.as_str()];
        if let Some(end) = &end {
            segments.push(end);
        }
        self.paged(&segments, cursor, page_size)
    }

    pub fn package_summary(&self, package_id: &str) -> Url {
        self.url(&["packages", package_id, "summary"])
    }

    pub fn package_granules(&self, package_id: &str, cursor: &str, page_size: u32) -> Url {
        self.paged(&["packages", package_id, "granules"], cursor, page_size)
    }

    pub fn granule_summary(&self, package_id: &str, granule_id: &str) -> Url {
        self.url(&["packages", package_id, "granules", granule_id, "summary"])
    }

    pub fn search(&self) -> Url {
        self.url(&["search"])
    }

    /// `/published/{start}[/{end}]?offsetMark=..&pageSize=..` plus filters.
    pub fn published(
        &self, start: NaiveDate, end: Option<NaiveDate>, filter: &PublishedFilter, cursor: &str, page_size: u32,
    ) -> Url {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.map(|d| d.format("%Y-%m-%d").to_string());
        let mut segments = vec!["published", start.as_str()];
        if let Some(end) = &end {
            segments.push(end);
        }

        let mut url = self.paged(&segments, cursor, page_size);
        {
            let mut query = url.query_pairs_mut();
            if !filter.collections.is_empty() {
                query.append_pair("collection", &filter.collections.join(","));
            }
            if let Some(doc_class) = &filter.doc_class {
                query.append_pair("docClass", doc_class);
            }
            if let Some(congress) = filter.congress {
                query.append_pair("congress", &congress.to_string());
            }
            if let Some(since) = filter.modified_since {
                query.append_pair("modifiedSince", &format_timestamp(since));
            }
        }
        url
    }

    pub fn related(&self, package_id: &str) -> Url {
        self.url(&["related", package_id])
    }

    pub fn related_by_type(&self, package_id: &str, relationship: &str) -> Url {
        self.url(&["related", package_id, relationship])
    }
}

/// Sort clause of a search request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field: String,
    pub sort_order: String,
}

/// Body of `POST /search`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    /// Sent as a string, as the API expects.
    pub page_size: String,
    pub offset_mark: String,
    pub sorts: Vec<SortField>,
}

impl SearchRequest {
    /// First page of results ranked by relevance.
    pub fn new(query: impl Into<String>, page_size: u32) -> Self {
        Self {
            query: query.into(),
            page_size: page_size.to_string(),
            offset_mark: "*".into(),
            sorts: vec![SortField { field: "score".into(), sort_order: "DESC".into() }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn endpoints() -> Endpoints {
        Endpoints::new("https://api.govinfo.gov").unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 5, 7, 8, 9).unwrap();
        assert_eq!(format_timestamp(dt), "2024-01-05T07:08:09Z");
    }

    #[test]
    fn test_collection_packages_open_window() {
        let window = PackageWindow::new("BILLS", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let url = endpoints().collection_packages(&window, "*", 100);
        assert_eq!(
            url.as_str(),
            "https://api.govinfo.gov/collections/BILLS/2024-01-01T00:00:00Z?offsetMark=*&pageSize=100"
        );
    }

    #[test]
    fn test_collection_packages_closed_window() {
        let window = PackageWindow::new("FR", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .until(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap());
        let url = endpoints().collection_packages(&window, "AoJ+x", 25);
        assert_eq!(url.path(), "/collections/FR/2024-01-01T00:00:00Z/2024-01-31T23:59:59Z");
        assert_eq!(url.query(), Some("offsetMark=AoJ%2Bx&pageSize=25"));
    }

    #[test]
    fn test_granule_urls() {
        let e = endpoints();
        assert_eq!(
            e.package_granules("CREC-2024-01-03", "*", 50).as_str(),
            "https://api.govinfo.gov/packages/CREC-2024-01-03/granules?offsetMark=*&pageSize=50"
        );
        assert_eq!(
            e.granule_summary("CREC-2024-01-03", "CREC-2024-01-03-pt1-PgH1").path(),
            "/packages/CREC-2024-01-03/granules/CREC-2024-01-03-pt1-PgH1/summary"
        );
    }

    #[test]
    fn test_published_urls() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let e = endpoints();
        assert_eq!(
            e.published(start, None, &PublishedFilter::default(), "*", 100).as_str(),
            "https://api.govinfo.gov/published/2024-05-01?offsetMark=*&pageSize=100"
        );

        let filter = PublishedFilter {
            collections: vec!["BILLS".into(), "FR".into()],
            congress: Some(118),
            modified_since: Some(Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()),
            ..Default::default()
        };
        let url = e.published(start, NaiveDate::from_ymd_opt(2024, 5, 31), &filter, "*", 10);
        assert_eq!(url.path(), "/published/2024-05-01/2024-05-31");
        assert_eq!(
            url.query(),
            Some("offsetMark=*&pageSize=10&collection=BILLS%2CFR&congress=118&modifiedSince=2024-05-02T12%3A00%3A00Z")
        );
    }

    #[test]
    fn test_related_urls() {
        let e = endpoints();
        assert_eq!(e.related("BILLS-118hr1enr").path(), "/related/BILLS-118hr1enr");
        assert_eq!(e.related_by_type("BILLS-118hr1enr", "HOB").path(), "/related/BILLS-118hr1enr/HOB");
    }

    #[test]
    fn test_base_url_with_prefix_and_trailing_slash() {
        let e = Endpoints::new("http://localhost:8080/govinfo/").unwrap();
        assert_eq!(e.package_summary("FR-2024-01-03").as_str(), "http://localhost:8080/govinfo/packages/FR-2024-01-03/summary");
        assert_eq!(e.collections().path(), "/govinfo/collections");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(Endpoints::new("not a url"), Err(GovInfoError::InvalidBaseUrl(_))));
        assert!(matches!(Endpoints::new("mailto:someone@example.com"), Err(GovInfoError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_search_body() {
        let body = serde_json::to_value(SearchRequest::new("appropriations", 10)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "query": "appropriations",
                "pageSize": "10",
                "offsetMark": "*",
                "sorts": [{"field": "score", "sortOrder": "DESC"}]
            })
        );
    }
}
