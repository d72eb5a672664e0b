//! Shared fixtures for the offline cache integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::database::{DatabaseAdapter, DatabaseConfig};
use bridge_traits::error::BridgeError;
use bridge_traits::time::{datetime_from_millis, Clock};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_cache::{CacheConfig, OfflineCache};
use core_library::adapters::SqliteAdapter;
use core_library::{
    CacheEntry, CacheEntryRepository, CachedTrackSummary, ClearOutcome, LibraryError, Result,
    SqliteCacheEntryRepository, TrackId, TrackMetadata,
};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: i64) -> i64 {
        self.millis.fetch_add(millis, Ordering::SeqCst) + millis
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        datetime_from_millis(self.unix_timestamp_millis()).expect("clock within range")
    }

    fn unix_timestamp_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Repository wrapper that can be told to fail specific calls.
pub struct FlakyRepository {
    inner: Arc<dyn CacheEntryRepository>,
    pub fail_touch: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FlakyRepository {
    pub fn new(inner: Arc<dyn CacheEntryRepository>) -> Self {
        Self {
            inner,
            fail_touch: AtomicBool::new(false),
            fail_upsert: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    fn injected(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(LibraryError::Bridge(BridgeError::DatabaseError(
                "database disk image is malformed".into(),
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheEntryRepository for FlakyRepository {
    async fn initialize(&self) -> Result<()> {
        self.inner.initialize().await
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<Option<u64>> {
        Self::injected(&self.fail_upsert)?;
        self.inner.upsert(entry).await
    }

    async fn find_by_id(&self, id: &TrackId) -> Result<Option<CacheEntry>> {
        self.inner.find_by_id(id).await
    }

    async fn exists(&self, id: &TrackId) -> Result<bool> {
        self.inner.exists(id).await
    }

    async fn size_of(&self, id: &TrackId) -> Result<Option<u64>> {
        self.inner.size_of(id).await
    }

    async fn touch(&self, id: &TrackId, accessed_at: i64) -> Result<bool> {
        Self::injected(&self.fail_touch)?;
        self.inner.touch(id, accessed_at).await
    }

    async fn delete(&self, id: &TrackId) -> Result<Option<u64>> {
        Self::injected(&self.fail_delete)?;
        self.inner.delete(id).await
    }

    async fn list_by_access_recency(&self) -> Result<Vec<CachedTrackSummary>> {
        self.inner.list_by_access_recency().await
    }

    async fn list_by_access_frequency(&self) -> Result<Vec<CachedTrackSummary>> {
        self.inner.list_by_access_frequency().await
    }

    async fn clear(&self) -> Result<ClearOutcome> {
        self.inner.clear().await
    }

    async fn total_bytes(&self) -> Result<u64> {
        self.inner.total_bytes().await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }
}

/// A ready cache over an in-memory SQLite store, with handles to its parts.
pub struct Harness {
    pub cache: Arc<OfflineCache>,
    pub repository: Arc<dyn CacheEntryRepository>,
    pub clock: Arc<ManualClock>,
    pub db: Arc<dyn DatabaseAdapter>,
}

impl Harness {
    pub async fn new(max_bytes: u64) -> Self {
        let db: Arc<dyn DatabaseAdapter> = Arc::new(
            SqliteAdapter::new(DatabaseConfig::in_memory())
                .await
                .expect("in-memory database"),
        );
        let repository: Arc<dyn CacheEntryRepository> =
            Arc::new(SqliteCacheEntryRepository::new(db.clone()));
        Self::over(max_bytes, db, repository).await
    }

    pub async fn over(
        max_bytes: u64,
        db: Arc<dyn DatabaseAdapter>,
        repository: Arc<dyn CacheEntryRepository>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = OfflineCache::with_repository(
            CacheConfig::new().with_max_size(max_bytes),
            repository.clone(),
        )
        .with_clock(clock.clone());
        cache.initialize().await.expect("cache initializes");

        Self {
            cache: Arc::new(cache),
            repository,
            clock,
            db,
        }
    }

    /// Admit `size` bytes under `id`, one tick after the previous admission.
    pub async fn admit(&self, id: &str, size: usize) {
        self.clock.advance(10);
        self.cache
            .admit(TrackId::new(id), metadata(id), payload(size))
            .await
            .expect("admission succeeds");
    }

    pub async fn fetch_times(&self, id: &str, times: usize) {
        for _ in 0..times {
            self.clock.advance(1);
            self.cache
                .fetch(&TrackId::new(id))
                .await
                .expect("fetch succeeds")
                .expect("track is cached");
        }
    }

    pub async fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .repository
            .list_by_access_frequency()
            .await
            .expect("listing succeeds")
            .into_iter()
            .map(|summary| summary.id.into_inner())
            .collect();
        ids.sort();
        ids
    }

    /// Running total and stored total must agree when nothing is in flight.
    pub async fn assert_consistent(&self) {
        let stored = self.repository.total_bytes().await.expect("total bytes");
        assert_eq!(
            self.cache.current_bytes().expect("cache ready"),
            stored,
            "running total drifted from store"
        );
    }
}

pub fn payload(size: usize) -> Bytes {
    Bytes::from(vec![0xA5u8; size])
}

pub fn metadata(id: &str) -> TrackMetadata {
    TrackMetadata::new()
        .with("title", format!("Track {}", id))
        .with("artist", "Test Artist")
        .with("duration", 180.5)
}
