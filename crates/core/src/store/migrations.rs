//! Catalog schema migrations.
//!
//! Applied versions are recorded in `_migrations`. Every pending migration
//! runs in its own transaction together with its version row, so a failed
//! migration leaves neither a half-built schema nor a recorded version.

use crate::Error;
use tokio_rusqlite::rusqlite::Transaction;
use tokio_rusqlite::{Connection, params};

/// Ordered `(version, SQL)` pairs. Versions must strictly increase.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_catalog.sql")),
    (2, include_str!("../../migrations/002_search_cache.sql")),
];

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` naming the version whose SQL failed.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    apply(conn, MIGRATIONS).await
}

async fn apply(conn: &Connection, migrations: &'static [(i64, &'static str)]) -> Result<(), Error> {
    conn.call(move |conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in migrations.iter().filter(|(version, _)| *version > current) {
            let tx = conn.transaction()?;
            apply_one(&tx, version, sql).map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.commit()?;
            tracing::debug!(version, "migration applied");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn apply_one(tx: &Transaction<'_>, version: i64, sql: &str) -> tokio_rusqlite::rusqlite::Result<()> {
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
        params![version, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
