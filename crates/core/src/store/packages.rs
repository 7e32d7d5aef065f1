//! Package rows.

use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row};

use super::codec::{opt_json_at, opt_ts_at, ts_at};
use super::collections;
use super::connection::CatalogDb;
use crate::Error;
use crate::ingest::reconcile;
use crate::models::{Package, PackageRecord};

pub(crate) const COLUMNS: &str = "id, package_id, title, collection_id, collection_code, collection_name, category,
    date_issued, last_modified, branch, congress, session, download_links, related_links, references_json,
    metadata, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(0)?,
        package_id: row.get(1)?,
        title: row.get(2)?,
        collection_id: row.get(3)?,
        collection_code: row.get(4)?,
        collection_name: row.get(5)?,
        category: row.get(6)?,
        date_issued: row.get(7)?,
        last_modified: opt_ts_at(row, 8)?,
        branch: row.get(9)?,
        congress: row.get(10)?,
        session: row.get(11)?,
        download_links: opt_json_at(row, 12)?,
        related_links: opt_json_at(row, 13)?,
        references: opt_json_at(row, 14)?,
        metadata: opt_json_at(row, 15)?,
        created_at: ts_at(row, 16)?,
        updated_at: ts_at(row, 17)?,
    })
}

pub(crate) fn find_by_id(conn: &rusqlite::Connection, package_id: &str) -> rusqlite::Result<Option<Package>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM packages WHERE package_id = ?1"))?;
    match stmt.query_row(params![package_id], from_row) {
        Ok(package) => Ok(Some(package)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

impl CatalogDb {
    /// Get a package by its identifier.
    pub async fn get_package(&self, package_id: &str) -> Result<Option<Package>, Error> {
        let package_id = package_id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Package>, Error> { Ok(find_by_id(conn, &package_id)?) })
            .await
            .map_err(Error::from)
    }

    /// Packages of one collection, ordered by identifier.
    pub async fn list_packages(&self, collection_code: &str) -> Result<Vec<Package>, Error> {
        let code = collection_code.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<Package>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM packages WHERE collection_code = ?1 ORDER BY package_id"
                ))?;
                let rows = stmt.query_map(params![code], from_row)?.collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Total number of stored packages.
    pub async fn count_packages(&self) -> Result<i64, Error> {
        self.conn
            .call(|conn| -> Result<i64, Error> {
                Ok(conn.query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?)
            })
            .await
            .map_err(Error::from)
    }

    /// Reconcile one package record under a collection and commit it.
    ///
    /// Returns the resulting row.
    ///
    /// # Errors
    ///
    /// Returns `Error::CollectionNotFound` if the collection is not stored.
    pub async fn upsert_package(&self, collection_code: &str, record: PackageRecord) -> Result<Package, Error> {
        let code = collection_code.to_string();
        self.conn
            .call(move |conn| -> Result<Package, Error> {
                let tx = conn.transaction()?;
                let collection = collections::find_by_code(&tx, &code)?.ok_or(Error::CollectionNotFound(code))?;
                reconcile::merge_package(&tx, &collection.into(), &record)?;
                let package = find_by_id(&tx, record.package_id())?
                    .ok_or_else(|| Error::PackageNotFound(record.package_id().to_string()))?;
                tx.commit()?;
                Ok(package)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a package and, by cascade, its granules.
    pub async fn delete_package(&self, package_id: &str) -> Result<bool, Error> {
        let package_id = package_id.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM packages WHERE package_id = ?1", params![package_id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
