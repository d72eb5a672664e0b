//! Test doubles shared by the unit tests in this crate.

use async_trait::async_trait;
use core_library::{
    CacheEntry, CacheEntryRepository, CachedTrackSummary, ClearOutcome, Result, TrackId,
    TrackMetadata,
};
use mockall::mock;

mock! {
    pub Repo {}

    #[async_trait]
    impl CacheEntryRepository for Repo {
        async fn initialize(&self) -> Result<()>;
        async fn upsert(&self, entry: &CacheEntry) -> Result<Option<u64>>;
        async fn find_by_id(&self, id: &TrackId) -> Result<Option<CacheEntry>>;
        async fn exists(&self, id: &TrackId) -> Result<bool>;
        async fn size_of(&self, id: &TrackId) -> Result<Option<u64>>;
        async fn touch(&self, id: &TrackId, accessed_at: i64) -> Result<bool>;
        async fn delete(&self, id: &TrackId) -> Result<Option<u64>>;
        async fn list_by_access_recency(&self) -> Result<Vec<CachedTrackSummary>>;
        async fn list_by_access_frequency(&self) -> Result<Vec<CachedTrackSummary>>;
        async fn clear(&self) -> Result<ClearOutcome>;
        async fn total_bytes(&self) -> Result<u64>;
        async fn count(&self) -> Result<u64>;
    }
}

pub fn summary(
    id: &str,
    byte_size: u64,
    access_count: u64,
    cached_at: i64,
    sequence: i64,
) -> CachedTrackSummary {
    CachedTrackSummary {
        id: TrackId::new(id),
        metadata: TrackMetadata::new(),
        byte_size,
        cached_at,
        last_accessed_at: None,
        access_count,
        sequence,
    }
}
