//! Merge rules for incoming records.
//!
//! A basic record (what a listing page carries) only ever refreshes
//! `last_modified` and `updated_at` on an existing row; it never blanks
//! fields a previous full merge wrote. A full record overwrites every mapped
//! scalar and replaces each structured blob wholesale. `created_at` is set
//! once, on insert.
//!
//! These functions run on a borrowed connection or transaction and never
//! commit; the caller owns the transaction boundary.

use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::Connection;

use crate::Error;
use crate::models::{
    Collection, GranuleBasic, GranuleDetail, GranuleRecord, Package, PackageBasic, PackageDetail, PackageRecord,
    compact_blob,
};
use crate::store::{blob_text, opt_ts, ts};

/// The stored collection a package merges under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub id: i64,
    pub code: String,
}

impl From<Collection> for CollectionRef {
    fn from(collection: Collection) -> Self {
        Self { id: collection.id, code: collection.collection_code }
    }
}

/// The stored package a granule merges under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub id: i64,
    pub package_id: String,
}

impl From<Package> for PackageRef {
    fn from(package: Package) -> Self {
        Self { id: package.id, package_id: package.package_id }
    }
}

/// Upsert one package row keyed on its package identifier.
pub fn merge_package(conn: &Connection, parent: &CollectionRef, record: &PackageRecord) -> Result<(), Error> {
    match record {
        PackageRecord::Basic(basic) => merge_package_basic(conn, parent, basic),
        PackageRecord::Full(detail) => merge_package_full(conn, parent, detail),
    }
}

fn merge_package_basic(conn: &Connection, parent: &CollectionRef, basic: &PackageBasic) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO packages (package_id, collection_id, collection_code, last_modified, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        ON CONFLICT(package_id) DO UPDATE SET
            last_modified = COALESCE(excluded.last_modified, packages.last_modified),
            updated_at = excluded.updated_at",
        params![basic.package_id, parent.id, parent.code, ts(basic.last_modified), ts(Utc::now())],
    )?;
    Ok(())
}

fn merge_package_full(conn: &Connection, parent: &CollectionRef, detail: &PackageDetail) -> Result<(), Error> {
    let download = detail.download.as_ref().and_then(compact_blob);
    let related = detail.related.as_ref().and_then(compact_blob);
    let metadata = compact_blob(&detail.extra);

    conn.execute(
        "INSERT INTO packages (
            package_id, title, collection_id, collection_code, collection_name, category, date_issued,
            last_modified, branch, congress, session, download_links, related_links, references_json,
            metadata, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
        ON CONFLICT(package_id) DO UPDATE SET
            title = excluded.title,
            collection_id = excluded.collection_id,
            collection_code = excluded.collection_code,
            collection_name = excluded.collection_name,
            category = excluded.category,
            date_issued = excluded.date_issued,
            last_modified = excluded.last_modified,
            branch = excluded.branch,
            congress = excluded.congress,
            session = excluded.session,
            download_links = excluded.download_links,
            related_links = excluded.related_links,
            references_json = excluded.references_json,
            metadata = excluded.metadata,
            updated_at = excluded.updated_at",
        params![
            detail.package_id,
            detail.title,
            parent.id,
            parent.code,
            detail.collection_name,
            detail.category,
            detail.date_issued,
            opt_ts(detail.last_modified),
            detail.branch,
            detail.congress,
            detail.session,
            blob_text(download.as_ref())?,
            blob_text(related.as_ref())?,
            blob_text(detail.references.as_ref())?,
            blob_text(metadata.as_ref())?,
            ts(Utc::now()),
        ],
    )?;
    Ok(())
}

/// Upsert one granule row keyed on its granule identifier.
pub fn merge_granule(conn: &Connection, parent: &PackageRef, record: &GranuleRecord) -> Result<(), Error> {
    match record {
        GranuleRecord::Basic(basic) => merge_granule_basic(conn, parent, basic),
        GranuleRecord::Full(detail) => merge_granule_full(conn, parent, detail),
    }
}

// Title and class from a listing page are written on insert only.
fn merge_granule_basic(conn: &Connection, parent: &PackageRef, basic: &GranuleBasic) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO granules (
            granule_id, title, package_row_id, package_id, granule_class, last_modified, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
        ON CONFLICT(granule_id) DO UPDATE SET
            last_modified = COALESCE(excluded.last_modified, granules.last_modified),
            updated_at = excluded.updated_at",
        params![
            basic.granule_id,
            basic.title,
            parent.id,
            parent.package_id,
            basic.granule_class,
            opt_ts(basic.last_modified),
            ts(Utc::now()),
        ],
    )?;
    Ok(())
}

fn merge_granule_full(conn: &Connection, parent: &PackageRef, detail: &GranuleDetail) -> Result<(), Error> {
    let download = detail.download.as_ref().and_then(compact_blob);
    let metadata = compact_blob(&detail.extra);

    conn.execute(
        "INSERT INTO granules (
            granule_id, title, package_row_id, package_id, granule_class, collection_code, date_issued,
            last_modified, download_links, metadata, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
        ON CONFLICT(granule_id) DO UPDATE SET
            title = excluded.title,
            package_row_id = excluded.package_row_id,
            package_id = excluded.package_id,
            granule_class = excluded.granule_class,
            collection_code = excluded.collection_code,
            date_issued = excluded.date_issued,
            last_modified = excluded.last_modified,
            download_links = excluded.download_links,
            metadata = excluded.metadata,
            updated_at = excluded.updated_at",
        params![
            detail.granule_id,
            detail.title,
            parent.id,
            parent.package_id,
            detail.granule_class,
            detail.collection_code,
            detail.date_issued,
            opt_ts(detail.last_modified),
            blob_text(download.as_ref())?,
            blob_text(metadata.as_ref())?,
            ts(Utc::now()),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CatalogDb;
    use crate::ingest::testing::{collection, granule_basic, granule_detail, package_basic, package_detail};
    use serde_json::json;

    async fn seeded() -> CatalogDb {
        let db = CatalogDb::open_in_memory().await.unwrap();
        db.upsert_collections(vec![collection("BILLS")]).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_basic_merge_keeps_full_fields() {
        let db = seeded().await;
        db.upsert_package("BILLS", PackageRecord::Full(package_detail("BILLS-118hr1", "BILLS", json!({"pdfLink": "A"}))))
            .await
            .unwrap();

        let after = db
            .upsert_package("BILLS", PackageRecord::Basic(package_basic("BILLS-118hr1", "2024-03-01T12:00:00Z")))
            .await
            .unwrap();

        assert_eq!(after.title.as_deref(), Some("Title of BILLS-118hr1"));
        assert_eq!(after.download_links.unwrap().get("pdfLink"), Some(&json!("A")));
        assert_eq!(after.metadata.unwrap().get("billType"), Some(&json!("hr")));
        assert_eq!(after.last_modified.unwrap().to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[tokio::test]
    async fn test_full_merge_keeps_unmodeled_fields_in_metadata() {
        let db = seeded().await;
        let detail: PackageDetail = serde_json::from_value(json!({
            "packageId": "BILLS-118hr2",
            "collectionCode": "BILLS",
            "detailsLink": "https://www.govinfo.gov/app/details/BILLS-118hr2",
            "shortTitle": [{"title": "Secure the Border Act"}],
            "lastModified": null
        }))
        .unwrap();

        let row = db.upsert_package("BILLS", PackageRecord::Full(detail)).await.unwrap();

        let metadata = row.metadata.unwrap();
        assert_eq!(metadata.get("detailsLink"), Some(&json!("https://www.govinfo.gov/app/details/BILLS-118hr2")));
        assert!(metadata.contains_key("shortTitle"));
        assert!(!metadata.contains_key("lastModified"));
    }

    #[tokio::test]
    async fn test_full_merge_replaces_blobs() {
        let db = seeded().await;
        db.upsert_package("BILLS", PackageRecord::Full(package_detail("BILLS-118hr1", "BILLS", json!({"pdfLink": "A"}))))
            .await
            .unwrap();

        let after = db
            .upsert_package("BILLS", PackageRecord::Full(package_detail("BILLS-118hr1", "BILLS", json!({"xmlLink": "B"}))))
            .await
            .unwrap();

        let download = after.download_links.unwrap();
        assert_eq!(download.len(), 1);
        assert_eq!(download.get("xmlLink"), Some(&json!("B")));
        assert!(!download.contains_key("pdfLink"));
    }

    #[tokio::test]
    async fn test_full_merge_preserves_created_at() {
        let db = seeded().await;
        let first = db
            .upsert_package("BILLS", PackageRecord::Basic(package_basic("BILLS-118hr1", "2024-01-01T00:00:00Z")))
            .await
            .unwrap();
        let second = db
            .upsert_package("BILLS", PackageRecord::Full(package_detail("BILLS-118hr1", "BILLS", json!({}))))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert!(second.download_links.is_none());
    }

    #[tokio::test]
    async fn test_null_blob_members_not_stored() {
        let db = seeded().await;
        let stored = db
            .upsert_package(
                "BILLS",
                PackageRecord::Full(package_detail("BILLS-118hr1", "BILLS", json!({"pdfLink": "A", "xmlLink": null}))),
            )
            .await
            .unwrap();

        let download = stored.download_links.unwrap();
        assert_eq!(download.len(), 1);
        assert!(!download.contains_key("xmlLink"));
    }

    #[tokio::test]
    async fn test_granule_basic_merge_keeps_detail() {
        let db = seeded().await;
        db.upsert_package("BILLS", PackageRecord::Basic(package_basic("CREC-2024-01-03", "2024-01-04T00:00:00Z")))
            .await
            .unwrap();
        db.upsert_granule(
            "CREC-2024-01-03",
            GranuleRecord::Full(granule_detail("CREC-2024-01-03-pt1-PgH1", "CREC-2024-01-03")),
        )
        .await
        .unwrap();

        let after = db
            .upsert_granule("CREC-2024-01-03", GranuleRecord::Basic(granule_basic("CREC-2024-01-03-pt1-PgH1")))
            .await
            .unwrap();

        assert_eq!(after.title.as_deref(), Some("House Section"));
        assert!(after.download_links.is_some());
        assert_eq!(after.collection_code.as_deref(), Some("CREC"));
    }

    #[test]
    fn test_refs_from_rows() {
        let now = Utc::now();
        let collection = Collection {
            id: 7,
            collection_code: "FR".into(),
            collection_name: "Federal Register".into(),
            package_count: 0,
            granule_count: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(CollectionRef::from(collection), CollectionRef { id: 7, code: "FR".into() });
    }
}
