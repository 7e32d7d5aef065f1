//! GovInfo response envelopes.
//!
//! Listing endpoints wrap their records with a total count and a reference
//! to the next page; these envelopes unwrap into core [`Page`] values.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use govsync_core::models::{CollectionInfo, GranuleBasic, Page, PackageBasic};

use super::error::GovInfoError;

/// Response from `/collections`.
#[derive(Debug, Deserialize)]
pub struct CollectionsEnvelope {
    pub collections: Vec<CollectionInfo>,
}

/// Response from `/collections/{code}/{start}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagesEnvelope {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageBasic>,
}

/// Response from `/packages/{id}/granules`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GranulesEnvelope {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub granules: Vec<GranuleBasic>,
}

impl From<PackagesEnvelope> for Page<PackageBasic> {
    fn from(envelope: PackagesEnvelope) -> Self {
        Page { records: envelope.packages, next_page: envelope.next_page, count: envelope.count }
    }
}

impl From<GranulesEnvelope> for Page<GranuleBasic> {
    fn from(envelope: GranulesEnvelope) -> Self {
        Page { records: envelope.granules, next_page: envelope.next_page, count: envelope.count }
    }
}

/// Decode a JSON response body.
pub fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GovInfoError> {
    serde_json::from_slice(bytes).map_err(|e| GovInfoError::Parse(e.to_string()))
}
