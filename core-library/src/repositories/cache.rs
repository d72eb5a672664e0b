//! Database repository for cached tracks
//!
//! Stores cached tracks (metadata, payload and access accounting) in a single
//! SQLite table through the `DatabaseAdapter` trait.

use crate::error::{LibraryError, Result};
use crate::models::{CacheEntry, CachedTrackSummary, ClearOutcome, TrackId, TrackMetadata};
use bridge_traits::database::{DatabaseAdapter, DatabaseTransaction, QueryRow, QueryValue};
use bridge_traits::error::BridgeError;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

const SUMMARY_COLUMNS: &str =
    "seq, id, metadata, byte_size, cached_at, last_accessed_at, access_count";

/// Repository trait for cached track operations.
#[async_trait::async_trait]
pub trait CacheEntryRepository: Send + Sync {
    /// Create the table and its access-path indexes if they do not exist.
    async fn initialize(&self) -> Result<()>;

    /// Insert or replace an entry.
    ///
    /// On replacement the existing `cached_at`, `last_accessed_at` and
    /// `access_count` are kept. Returns the byte size of the replaced row.
    async fn upsert(&self, entry: &CacheEntry) -> Result<Option<u64>>;

    /// Find a cached track by id.
    async fn find_by_id(&self, id: &TrackId) -> Result<Option<CacheEntry>>;

    /// Check for presence without reading the payload.
    async fn exists(&self, id: &TrackId) -> Result<bool>;

    /// Stored byte size of an entry.
    async fn size_of(&self, id: &TrackId) -> Result<Option<u64>>;

    /// Record one read. Returns `false` if the entry no longer exists.
    async fn touch(&self, id: &TrackId, accessed_at: i64) -> Result<bool>;

    /// Delete an entry, returning the bytes actually removed.
    async fn delete(&self, id: &TrackId) -> Result<Option<u64>>;

    /// All entries, least recently accessed first (never-read entries lead).
    async fn list_by_access_recency(&self) -> Result<Vec<CachedTrackSummary>>;

    /// All entries, least frequently accessed first, oldest first among ties.
    async fn list_by_access_frequency(&self) -> Result<Vec<CachedTrackSummary>>;

    /// Delete every entry.
    async fn clear(&self) -> Result<ClearOutcome>;

    /// Sum of `byte_size` over all entries.
    async fn total_bytes(&self) -> Result<u64>;

    /// Number of entries.
    async fn count(&self) -> Result<u64>;
}

/// SQLite implementation of CacheEntryRepository.
pub struct SqliteCacheEntryRepository {
    db: Arc<dyn DatabaseAdapter>,
}

impl SqliteCacheEntryRepository {
    /// Create a new repository with the given database adapter.
    pub fn new(db: Arc<dyn DatabaseAdapter>) -> Self {
        Self { db }
    }

    /// Convert a full QueryRow to CacheEntry.
    fn row_to_entry(row: &QueryRow) -> Result<CacheEntry> {
        let payload = match row.get("payload") {
            Some(QueryValue::Blob(bytes)) => Bytes::copy_from_slice(bytes),
            Some(QueryValue::Null) | None => {
                return Err(LibraryError::Corrupt("Missing column: payload".to_string()))
            }
            Some(_) => {
                return Err(LibraryError::Corrupt(
                    "Invalid type for column: payload".to_string(),
                ))
            }
        };

        Ok(CacheEntry {
            id: TrackId::new(get_string(row, "id")?),
            metadata: TrackMetadata::from_json(&get_string(row, "metadata")?)?,
            payload,
            byte_size: get_u64(row, "byte_size")?,
            cached_at: get_i64(row, "cached_at")?,
            last_accessed_at: get_optional_i64(row, "last_accessed_at")?,
            access_count: get_u64(row, "access_count")?,
        })
    }

    /// Convert a payload-free QueryRow to CachedTrackSummary.
    fn row_to_summary(row: &QueryRow) -> Result<CachedTrackSummary> {
        Ok(CachedTrackSummary {
            id: TrackId::new(get_string(row, "id")?),
            metadata: TrackMetadata::from_json(&get_string(row, "metadata")?)?,
            byte_size: get_u64(row, "byte_size")?,
            cached_at: get_i64(row, "cached_at")?,
            last_accessed_at: get_optional_i64(row, "last_accessed_at")?,
            access_count: get_u64(row, "access_count")?,
            sequence: get_i64(row, "seq")?,
        })
    }

    async fn list_ordered(&self, order_by: &str) -> Result<Vec<CachedTrackSummary>> {
        let sql = format!(
            "SELECT {} FROM cached_tracks ORDER BY {}",
            SUMMARY_COLUMNS, order_by
        );

        let rows = self.db.query(&sql, &[]).await.map_err(|e| {
            error!("Failed to list cached tracks: {}", e);
            LibraryError::from(e)
        })?;

        rows.iter().map(Self::row_to_summary).collect()
    }

    /// Runs the read-old-size-then-write sequence of an upsert inside `tx`.
    async fn upsert_in(
        tx: &mut dyn DatabaseTransaction,
        entry: &CacheEntry,
        metadata_json: String,
    ) -> std::result::Result<Option<u64>, BridgeError> {
        let id = QueryValue::Text(entry.id.to_string());

        // Take the write lock before reading the old size
        tx.execute(
            "UPDATE cached_tracks SET byte_size = byte_size WHERE id = ?",
            std::slice::from_ref(&id),
        )
        .await?;

        let rows = tx
            .query(
                "SELECT byte_size FROM cached_tracks WHERE id = ?",
                std::slice::from_ref(&id),
            )
            .await?;
        let previous = match rows.first() {
            Some(row) => Some(
                get_u64(row, "byte_size")
                    .map_err(|e| BridgeError::InvalidData(e.to_string()))?,
            ),
            None => None,
        };

        let sql = r#"
            INSERT INTO cached_tracks (
                id, metadata, payload, byte_size, cached_at, last_accessed_at, access_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                metadata = excluded.metadata,
                payload = excluded.payload,
                byte_size = excluded.byte_size
        "#;

        let params = vec![
            id,
            QueryValue::Text(metadata_json),
            QueryValue::Blob(entry.payload.to_vec()),
            QueryValue::Integer(entry.byte_size as i64),
            QueryValue::Integer(entry.cached_at),
            QueryValue::from(entry.last_accessed_at),
            QueryValue::Integer(entry.access_count as i64),
        ];

        tx.execute(sql, &params).await?;
        Ok(previous)
    }
}

#[async_trait::async_trait]
impl CacheEntryRepository for SqliteCacheEntryRepository {
    #[instrument(skip(self))]
    async fn initialize(&self) -> Result<()> {
        debug!("Initializing cached tracks repository");

        let statements = [
            (
                "CREATE TABLE IF NOT EXISTS cached_tracks (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    metadata TEXT NOT NULL,
                    payload BLOB NOT NULL,
                    byte_size INTEGER NOT NULL,
                    cached_at INTEGER NOT NULL,
                    last_accessed_at INTEGER,
                    access_count INTEGER NOT NULL DEFAULT 0
                )",
                &[] as &[QueryValue],
            ),
            (
                "CREATE INDEX IF NOT EXISTS idx_cached_tracks_frequency ON cached_tracks(access_count, cached_at, seq)",
                &[],
            ),
            (
                "CREATE INDEX IF NOT EXISTS idx_cached_tracks_recency ON cached_tracks(last_accessed_at, cached_at, seq)",
                &[],
            ),
        ];

        self.db.execute_batch(&statements).await.map_err(|e| {
            error!("Failed to create cached_tracks table: {}", e);
            LibraryError::from(e)
        })?;

        debug!("Cached tracks repository initialized");
        Ok(())
    }

    #[instrument(skip(self, entry), fields(id = %entry.id, byte_size = entry.byte_size))]
    async fn upsert(&self, entry: &CacheEntry) -> Result<Option<u64>> {
        entry
            .validate()
            .map_err(|message| LibraryError::InvalidInput {
                field: "entry".to_string(),
                message,
            })?;
        let metadata_json = entry.metadata.to_json()?;

        let mut tx = self.db.begin_transaction().await.map_err(|e| {
            error!("Failed to begin upsert transaction: {}", e);
            LibraryError::from(e)
        })?;

        match Self::upsert_in(tx.as_mut(), entry, metadata_json).await {
            Ok(previous) => {
                tx.commit().await.map_err(|e| {
                    error!("Failed to commit cached track: {}", e);
                    LibraryError::from(e)
                })?;
                debug!(previous_size = ?previous, "Cached track upserted");
                Ok(previous)
            }
            Err(e) => {
                error!("Failed to upsert cached track: {}", e);
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed upsert failed: {}", rollback_err);
                }
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &TrackId) -> Result<Option<CacheEntry>> {
        let sql = "SELECT * FROM cached_tracks WHERE id = ?";
        let params = vec![QueryValue::Text(id.to_string())];

        let row = self.db.query_one_optional(sql, &params).await.map_err(|e| {
            error!("Failed to query cached track: {}", e);
            LibraryError::from(e)
        })?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    #[instrument(skip(self))]
    async fn exists(&self, id: &TrackId) -> Result<bool> {
        let sql = "SELECT 1 as present FROM cached_tracks WHERE id = ? LIMIT 1";
        let params = vec![QueryValue::Text(id.to_string())];

        let row = self.db.query_one_optional(sql, &params).await.map_err(|e| {
            error!("Failed to probe cached track: {}", e);
            LibraryError::from(e)
        })?;

        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn size_of(&self, id: &TrackId) -> Result<Option<u64>> {
        let sql = "SELECT byte_size FROM cached_tracks WHERE id = ?";
        let params = vec![QueryValue::Text(id.to_string())];

        let row = self.db.query_one_optional(sql, &params).await.map_err(|e| {
            error!("Failed to read cached track size: {}", e);
            LibraryError::from(e)
        })?;

        row.as_ref().map(|row| get_u64(row, "byte_size")).transpose()
    }

    #[instrument(skip(self))]
    async fn touch(&self, id: &TrackId, accessed_at: i64) -> Result<bool> {
        let sql = "UPDATE cached_tracks SET access_count = access_count + 1, last_accessed_at = ? WHERE id = ?";
        let params = vec![
            QueryValue::Integer(accessed_at),
            QueryValue::Text(id.to_string()),
        ];

        let updated = self.db.execute(sql, &params).await.map_err(|e| {
            error!("Failed to record access: {}", e);
            LibraryError::from(e)
        })?;

        Ok(updated > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &TrackId) -> Result<Option<u64>> {
        let sql = "DELETE FROM cached_tracks WHERE id = ? RETURNING byte_size";
        let params = vec![QueryValue::Text(id.to_string())];

        let rows = self.db.query(sql, &params).await.map_err(|e| {
            error!("Failed to delete cached track: {}", e);
            LibraryError::from(e)
        })?;

        rows.first()
            .map(|row| get_u64(row, "byte_size"))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_by_access_recency(&self) -> Result<Vec<CachedTrackSummary>> {
        // NULL sorts first: never-read entries are the least recent
        self.list_ordered("last_accessed_at ASC, cached_at ASC, seq ASC")
            .await
    }

    #[instrument(skip(self))]
    async fn list_by_access_frequency(&self) -> Result<Vec<CachedTrackSummary>> {
        self.list_ordered("access_count ASC, cached_at ASC, seq ASC")
            .await
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<ClearOutcome> {
        let rows = self
            .db
            .query("DELETE FROM cached_tracks RETURNING byte_size", &[])
            .await
            .map_err(|e| {
                error!("Failed to clear cached tracks: {}", e);
                LibraryError::from(e)
            })?;

        let mut outcome = ClearOutcome::default();
        for row in &rows {
            outcome.entries += 1;
            outcome.bytes += get_u64(row, "byte_size")?;
        }

        debug!(entries = outcome.entries, bytes = outcome.bytes, "Cached tracks cleared");
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn total_bytes(&self) -> Result<u64> {
        let sql = "SELECT COALESCE(SUM(byte_size), 0) as total FROM cached_tracks";

        let rows = self.db.query(sql, &[]).await.map_err(|e| {
            error!("Failed to sum cached track sizes: {}", e);
            LibraryError::from(e)
        })?;

        match rows.first() {
            Some(row) => get_u64(row, "total"),
            None => Ok(0),
        }
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64> {
        let sql = "SELECT COUNT(*) as count FROM cached_tracks";

        let rows = self.db.query(sql, &[]).await.map_err(|e| {
            error!("Failed to count cached tracks: {}", e);
            LibraryError::from(e)
        })?;

        match rows.first() {
            Some(row) => get_u64(row, "count"),
            None => Ok(0),
        }
    }
}

// ============================================================================
// Helper functions for extracting values from QueryRow
// ============================================================================

fn get_string(row: &QueryRow, key: &str) -> Result<String> {
    row.get(key)
        .and_then(|value| value.as_string())
        .ok_or_else(|| LibraryError::Corrupt(format!("Missing column: {}", key)))
}

fn get_i64(row: &QueryRow, key: &str) -> Result<i64> {
    row.get(key)
        .and_then(|value| value.as_i64())
        .ok_or_else(|| LibraryError::Corrupt(format!("Missing column: {}", key)))
}

fn get_u64(row: &QueryRow, key: &str) -> Result<u64> {
    let value = get_i64(row, key)?;
    u64::try_from(value)
        .map_err(|_| LibraryError::Corrupt(format!("Negative value {} in column: {}", value, key)))
}

fn get_optional_i64(row: &QueryRow, key: &str) -> Result<Option<i64>> {
    Ok(match row.get(key) {
        Some(QueryValue::Null) | None => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| {
            LibraryError::Corrupt(format!("Invalid type for column: {}", key))
        })?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SqliteAdapter;
    use bridge_traits::database::DatabaseConfig;

    async fn setup() -> (Arc<dyn DatabaseAdapter>, SqliteCacheEntryRepository) {
        let adapter = SqliteAdapter::new(DatabaseConfig::in_memory()).await.unwrap();
        let db: Arc<dyn DatabaseAdapter> = Arc::new(adapter);
        let repo = SqliteCacheEntryRepository::new(db.clone());
        repo.initialize().await.unwrap();
        (db, repo)
    }

    fn entry(id: &str, size: usize, cached_at: i64) -> CacheEntry {
        CacheEntry::new(
            TrackId::new(id),
            TrackMetadata::new().with("title", format!("Track {}", id)),
            Bytes::from(vec![7u8; size]),
            cached_at,
        )
    }

    fn ids(summaries: &[CachedTrackSummary]) -> Vec<&str> {
        summaries.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (_db, repo) = setup().await;
        repo.upsert(&entry("a", 4, 1)).await.unwrap();

        repo.initialize().await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let (_db, repo) = setup().await;
        let original = entry("a", 16, 100);

        let previous = repo.upsert(&original).await.unwrap();
        assert_eq!(previous, None);

        let found = repo.find_by_id(&TrackId::new("a")).await.unwrap().unwrap();
        assert_eq!(found, original);
        assert_eq!(found.metadata.title(), Some("Track a"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_payload_and_keeps_accounting_fields() {
        let (_db, repo) = setup().await;
        let id = TrackId::new("a");
        repo.upsert(&entry("a", 10, 100)).await.unwrap();
        repo.touch(&id, 150).await.unwrap();

        let mut replacement = entry("a", 25, 900);
        replacement.metadata = TrackMetadata::new().with("title", "Remastered");
        let previous = repo.upsert(&replacement).await.unwrap();
        assert_eq!(previous, Some(10));

        let found = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.byte_size, 25);
        assert_eq!(found.payload.len(), 25);
        assert_eq!(found.metadata.title(), Some("Remastered"));
        assert_eq!(found.cached_at, 100);
        assert_eq!(found.access_count, 1);
        assert_eq!(found.last_accessed_at, Some(150));
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.total_bytes().await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_upsert_rejects_mismatched_size() {
        let (_db, repo) = setup().await;
        let mut bad = entry("a", 10, 1);
        bad.byte_size = 3;

        let result = repo.upsert(&bad).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let (_db, repo) = setup().await;
        let id = TrackId::new("missing");

        assert!(repo.find_by_id(&id).await.unwrap().is_none());
        assert!(!repo.exists(&id).await.unwrap());
        assert_eq!(repo.size_of(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_touch() {
        let (_db, repo) = setup().await;
        let id = TrackId::new("a");
        repo.upsert(&entry("a", 4, 1)).await.unwrap();

        assert!(repo.touch(&id, 10).await.unwrap());
        assert!(repo.touch(&id, 20).await.unwrap());

        let found = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.access_count, 2);
        assert_eq!(found.last_accessed_at, Some(20));
    }

    #[tokio::test]
    async fn test_touch_after_delete_does_not_resurrect() {
        let (_db, repo) = setup().await;
        let id = TrackId::new("a");
        repo.upsert(&entry("a", 4, 1)).await.unwrap();
        repo.delete(&id).await.unwrap();

        assert!(!repo.touch(&id, 10).await.unwrap());
        assert!(!repo.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_returns_removed_bytes() {
        let (_db, repo) = setup().await;
        let id = TrackId::new("a");
        repo.upsert(&entry("a", 42, 1)).await.unwrap();

        assert_eq!(repo.delete(&id).await.unwrap(), Some(42));
        assert_eq!(repo.delete(&id).await.unwrap(), None);
        assert_eq!(repo.total_bytes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_by_access_frequency() {
        let (_db, repo) = setup().await;
        repo.upsert(&entry("a", 1, 10)).await.unwrap();
        repo.upsert(&entry("b", 1, 20)).await.unwrap();
        repo.upsert(&entry("c", 1, 30)).await.unwrap();
        // Same timestamp as c, inserted later
        repo.upsert(&entry("d", 1, 30)).await.unwrap();

        for at in 0..5 {
            repo.touch(&TrackId::new("a"), 100 + at).await.unwrap();
        }

        let listed = repo.list_by_access_frequency().await.unwrap();
        assert_eq!(ids(&listed), vec!["b", "c", "d", "a"]);
        assert!(listed[1].sequence < listed[2].sequence);
    }

    #[tokio::test]
    async fn test_list_by_access_recency() {
        let (_db, repo) = setup().await;
        repo.upsert(&entry("a", 1, 10)).await.unwrap();
        repo.upsert(&entry("b", 1, 20)).await.unwrap();
        repo.upsert(&entry("c", 1, 30)).await.unwrap();

        repo.touch(&TrackId::new("a"), 500).await.unwrap();
        repo.touch(&TrackId::new("b"), 400).await.unwrap();

        let listed = repo.list_by_access_recency().await.unwrap();
        assert_eq!(ids(&listed), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_clear_reports_removed() {
        let (_db, repo) = setup().await;
        repo.upsert(&entry("a", 10, 1)).await.unwrap();
        repo.upsert(&entry("b", 32, 2)).await.unwrap();

        let outcome = repo.clear().await.unwrap();
        assert_eq!(outcome, ClearOutcome { entries: 2, bytes: 42 });
        assert_eq!(repo.count().await.unwrap(), 0);

        let again = repo.clear().await.unwrap();
        assert_eq!(again, ClearOutcome::default());
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_reported() {
        let (db, repo) = setup().await;
        repo.upsert(&entry("a", 4, 1)).await.unwrap();
        db.execute(
            "UPDATE cached_tracks SET metadata = 'not json' WHERE id = ?",
            &[QueryValue::Text("a".into())],
        )
        .await
        .unwrap();

        let result = repo.find_by_id(&TrackId::new("a")).await;
        assert!(matches!(result, Err(LibraryError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let (db, repo) = setup().await;
        db.close().await.unwrap();

        let err = repo.count().await.unwrap_err();
        assert!(err.is_store_unavailable());
    }
}
