//! Search cache operations.
//!
//! Query results are keyed by [`query_hash`] and expire lazily: a read past
//! `expires_at` is a miss even though the row is still stored. Expired rows
//! are overwritten by the next write for the same query or removed by
//! [`CatalogDb::purge_expired_search`].

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Row};

use super::codec::{json_at, ts, ts_at};
use super::connection::CatalogDb;
use super::hash::query_hash;
use crate::Error;
use crate::models::SearchCacheEntry;
use crate::transport::Transport;

fn from_row(row: &Row<'_>) -> rusqlite::Result<SearchCacheEntry> {
    Ok(SearchCacheEntry {
        query_hash: row.get(0)?,
        query: row.get(1)?,
        results: json_at(row, 2)?,
        result_count: row.get(3)?,
        created_at: ts_at(row, 4)?,
        expires_at: ts_at(row, 5)?,
    })
}

/// Result count reported by a search payload, 0 when absent.
fn payload_count(results: &Value) -> i64 {
    results.get("count").and_then(Value::as_i64).unwrap_or(0)
}

impl CatalogDb {
    /// Insert or refresh the cached results for a query.
    ///
    /// Uses UPSERT semantics: repeat calls for the same query text overwrite
    /// payload, count, creation time and expiry.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `ttl_hours` is negative or pushes the
    /// expiry past the representable date range.
    pub async fn put_search(&self, query: &str, results: &Value, ttl_hours: i64) -> Result<SearchCacheEntry, Error> {
        self.put_search_at(query, results, ttl_hours, Utc::now()).await
    }

    pub(crate) async fn put_search_at(
        &self, query: &str, results: &Value, ttl_hours: i64, now: DateTime<Utc>,
    ) -> Result<SearchCacheEntry, Error> {
        if ttl_hours < 0 {
            return Err(Error::InvalidInput(format!("ttl_hours must not be negative, got {ttl_hours}")));
        }
        let expires_at = Duration::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| Error::InvalidInput(format!("ttl_hours out of range, got {ttl_hours}")))?;

        let entry = SearchCacheEntry {
            query_hash: query_hash(query),
            query: query.to_string(),
            results: results.clone(),
            result_count: payload_count(results),
            created_at: now,
            expires_at,
        };
        let results_json = serde_json::to_string(&entry.results)?;
        let row = entry.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO search_cache (query_hash, query, results, result_count, created_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(query_hash) DO UPDATE SET
                        query = excluded.query,
                        results = excluded.results,
                        result_count = excluded.result_count,
                        created_at = excluded.created_at,
                        expires_at = excluded.expires_at",
                    params![
                        row.query_hash,
                        row.query,
                        results_json,
                        row.result_count,
                        ts(row.created_at),
                        ts(row.expires_at)
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(entry)
    }

    /// Get the cached results for a query.
    ///
    /// Returns None if the query was never cached or its entry has expired.
    pub async fn get_search(&self, query: &str) -> Result<Option<SearchCacheEntry>, Error> {
        self.get_search_at(query, Utc::now()).await
    }

    pub(crate) async fn get_search_at(&self, query: &str, now: DateTime<Utc>) -> Result<Option<SearchCacheEntry>, Error> {
        let key_hash = query_hash(query);
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<SearchCacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT query_hash, query, results, result_count, created_at, expires_at
                    FROM search_cache WHERE query_hash = ?1",
                )?;

                match stmt.query_row(params![key_hash], from_row) {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        Ok(stored.filter(|entry| !entry.is_expired_at(now)))
    }

    /// Delete expired search cache entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_search(&self) -> Result<u64, Error> {
        let now = ts(Utc::now());
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM search_cache WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

/// Read-through search: serve a fresh cached entry, otherwise query the
/// remote catalog and cache the payload for `ttl_hours`.
pub async fn cached_search<T: Transport + ?Sized>(
    db: &CatalogDb, transport: &T, query: &str, page_size: u32, ttl_hours: i64,
) -> Result<SearchCacheEntry, Error> {
    if let Some(entry) = db.get_search(query).await? {
        tracing::debug!(query, "search cache hit");
        return Ok(entry);
    }

    tracing::debug!(query, "search cache miss");
    let results = transport.search(query, page_size).await?;
    db.put_search(query, &results, ttl_hours).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::testing::FakeTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get_search() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        let payload = json!({"count": 10, "results": []});

        let written = db.put_search("test query", &payload, 24).await.unwrap();
        assert_eq!(written.result_count, 10);
        assert_eq!(written.query_hash, query_hash("test query"));

        let read = db.get_search("test query").await.unwrap().unwrap();
        assert_eq!(read.results, payload);
        assert_eq!(read.query, "test query");
    }

    #[tokio::test]
    async fn test_get_missing_search() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        assert!(db.get_search("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        let t0 = Utc::now();
        db.put_search_at("q", &json!({"count": 1}), 0, t0).await.unwrap();

        let later = t0 + Duration::milliseconds(1);
        assert!(db.get_search_at("q", later).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_day_ttl_valid_an_hour_later() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        let t0 = Utc::now();
        db.put_search_at("q", &json!({"count": 1}), 24, t0).await.unwrap();

        assert!(db.get_search_at("q", t0 + Duration::hours(1)).await.unwrap().is_some());
        assert!(db.get_search_at("q", t0 + Duration::hours(25)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_negative_ttl_rejected() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        let result = db.put_search("q", &json!({}), -1).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_huge_ttl_rejected() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        for ttl in [10_000_000_000, i64::MAX] {
            let result = db.put_search("q", &json!({}), ttl).await;
            assert!(matches!(result, Err(Error::InvalidInput(_))), "ttl {ttl}");
        }
        assert!(db.get_search("q").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_search_refreshes_entry() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        let t0 = Utc::now() - Duration::hours(48);
        db.put_search_at("q", &json!({"count": 1}), 0, t0).await.unwrap();
        db.put_search("q", &json!({"count": 2}), 24).await.unwrap();

        let read = db.get_search("q").await.unwrap().unwrap();
        assert_eq!(read.result_count, 2);
        assert!(read.created_at > t0);

        let rows: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM search_cache", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_purge_expired_search() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        db.put_search_at("stale", &json!({}), 1, Utc::now() - Duration::hours(2)).await.unwrap();
        db.put_search("fresh", &json!({}), 24).await.unwrap();

        let deleted = db.purge_expired_search().await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_search("fresh").await.unwrap().is_some());
    }

    #[test]
    fn test_payload_count_default() {
        assert_eq!(payload_count(&json!({"results": []})), 0);
        assert_eq!(payload_count(&json!({"count": 7})), 7);
    }

    #[tokio::test]
    async fn test_cached_search_reads_through() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        let transport = FakeTransport::default().with_search(json!({"count": 3, "results": []}));

        let first = cached_search(&db, &transport, "appropriations", 100, 24).await.unwrap();
        let second = cached_search(&db, &transport, "appropriations", 100, 24).await.unwrap();

        assert_eq!(first.result_count, 3);
        assert_eq!(second.result_count, 3);
        assert_eq!(transport.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_search_propagates_transport_error() {
        let db = CatalogDb::open_in_memory().await.unwrap();
        let transport = FakeTransport::default();

        let result = cached_search(&db, &transport, "appropriations", 100, 24).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert!(db.get_search("appropriations").await.unwrap().is_none());
    }
}
