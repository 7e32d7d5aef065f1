//! Collection rows.

use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row};

use super::codec::{ts, ts_at};
use super::connection::CatalogDb;
use crate::Error;
use crate::models::{Collection, CollectionInfo};

const COLUMNS: &str = "id, collection_code, collection_name, package_count, granule_count, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Collection> {
    Ok(Collection {
        id: row.get(0)?,
        collection_code: row.get(1)?,
        collection_name: row.get(2)?,
        package_count: row.get(3)?,
        granule_count: row.get(4)?,
        created_at: ts_at(row, 5)?,
        updated_at: ts_at(row, 6)?,
    })
}

/// Look up a collection by code on an open connection or transaction.
pub(crate) fn find_by_code(conn: &rusqlite::Connection, code: &str) -> rusqlite::Result<Option<Collection>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM collections WHERE collection_code = ?1"))?;
    match stmt.query_row(params![code], from_row) {
        Ok(collection) => Ok(Some(collection)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

impl CatalogDb {
    /// Insert or update collections by code, scalar fields only.
    ///
    /// All rows are written in a single transaction. Returns the number of
    /// descriptors processed.
    pub async fn upsert_collections(&self, collections: Vec<CollectionInfo>) -> Result<usize, Error> {
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let now = ts(Utc::now());
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO collections (
                            collection_code, collection_name, package_count, granule_count, created_at, updated_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                        ON CONFLICT(collection_code) DO UPDATE SET
                            collection_name = excluded.collection_name,
                            package_count = excluded.package_count,
                            granule_count = excluded.granule_count,
                            updated_at = excluded.updated_at",
                    )?;
                    for c in &collections {
                        stmt.execute(params![
                            &c.collection_code,
                            &c.collection_name,
                            c.package_count,
                            c.granule_count,
                            &now
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(collections.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a collection by code.
    ///
    /// Returns None if no collection with that code is stored.
    pub async fn get_collection(&self, code: &str) -> Result<Option<Collection>, Error> {
        let code = code.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Collection>, Error> { Ok(find_by_code(conn, &code)?) })
            .await
            .map_err(Error::from)
    }

    /// All stored collections ordered by code.
    pub async fn list_collections(&self) -> Result<Vec<Collection>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<Collection>, Error> {
                let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM collections ORDER BY collection_code"))?;
                let rows = stmt.query_map([], from_row)?.collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a collection and, by cascade, its packages and their granules.
    ///
    /// Returns false if no collection with that code was stored.
    pub async fn delete_collection(&self, code: &str) -> Result<bool, Error> {
        let code = code.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM collections WHERE collection_code = ?1", params![code])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
