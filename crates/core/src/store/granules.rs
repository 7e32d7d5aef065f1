//! Granule rows.

use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row};

use super::codec::{opt_json_at, opt_ts_at, ts_at};
use super::connection::CatalogDb;
use super::packages;
use crate::Error;
use crate::ingest::reconcile;
use crate::models::{Granule, GranuleRecord};

const COLUMNS: &str = "id, granule_id, title, package_row_id, package_id, granule_class, collection_code,
    date_issued, last_modified, download_links, metadata, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Granule> {
    Ok(Granule {
        id: row.get(0)?,
        granule_id: row.get(1)?,
        title: row.get(2)?,
        package_row_id: row.get(3)?,
        package_id: row.get(4)?,
        granule_class: row.get(5)?,
        collection_code: row.get(6)?,
        date_issued: row.get(7)?,
        last_modified: opt_ts_at(row, 8)?,
        download_links: opt_json_at(row, 9)?,
        metadata: opt_json_at(row, 10)?,
        created_at: ts_at(row, 11)?,
        updated_at: ts_at(row, 12)?,
    })
}

fn find_by_id(conn: &rusqlite::Connection, granule_id: &str) -> rusqlite::Result<Option<Granule>> {
    let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM granules WHERE granule_id = ?1"))?;
    match stmt.query_row(params![granule_id], from_row) {
        Ok(granule) => Ok(Some(granule)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

impl CatalogDb {
    /// Get a granule by its identifier.
    pub async fn get_granule(&self, granule_id: &str) -> Result<Option<Granule>, Error> {
        let granule_id = granule_id.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Granule>, Error> { Ok(find_by_id(conn, &granule_id)?) })
            .await
            .map_err(Error::from)
    }

    /// Granules of one package, ordered by identifier.
    pub async fn list_granules(&self, package_id: &str) -> Result<Vec<Granule>, Error> {
        let package_id = package_id.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<Granule>, Error> {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM granules WHERE package_id = ?1 ORDER BY granule_id"))?;
                let rows = stmt.query_map(params![package_id], from_row)?.collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Total number of stored granules.
    pub async fn count_granules(&self) -> Result<i64, Error> {
        self.conn
            .call(|conn| -> Result<i64, Error> {
                Ok(conn.query_row("SELECT COUNT(*) FROM granules", [], |row| row.get(0))?)
            })
            .await
            .map_err(Error::from)
    }

    /// Reconcile one granule record under a package and commit it.
    ///
    /// # Errors
    ///
    /// Returns `Error::PackageNotFound` if the package is not stored.
    pub async fn upsert_granule(&self, package_id: &str, record: GranuleRecord) -> Result<Granule, Error> {
        let package_id = package_id.to_string();
        self.conn
            .call(move |conn| -> Result<Granule, Error> {
                let tx = conn.transaction()?;
                let package = packages::find_by_id(&tx, &package_id)?.ok_or(Error::PackageNotFound(package_id))?;
                reconcile::merge_granule(&tx, &package.into(), &record)?;
                let granule = find_by_id(&tx, record.granule_id())?
                    .ok_or_else(|| Error::InvalidInput(format!("granule {} not stored", record.granule_id())))?;
                tx.commit()?;
                Ok(granule)
            })
            .await
            .map_err(Error::from)
    }
}
