//! # Offline Cache Facade
//!
//! Bounded offline store for downloaded tracks. Admission evicts the least
//! valuable entries to stay under the configured ceiling, reads record access
//! so frequently played tracks survive eviction, and every change to the set of
//! cached tracks is announced on the event bus.

use crate::accountant::CapacityAccountant;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::eviction::{EvictionEngine, EvictionReport, IncompleteEviction};
use crate::stats::CacheStats;
use bridge_traits::database::DatabaseAdapter;
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use core_library::{
    CacheEntry, CacheEntryRepository, CachedTrackSummary, ClearOutcome, LibraryError,
    SqliteCacheEntryRepository, TrackId, TrackMetadata,
};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle phase of an [`OfflineCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Everything that only exists once the store is open and the size resynced.
struct ReadyState {
    accountant: Arc<CapacityAccountant>,
    eviction: EvictionEngine,
}

/// Offline cache for downloaded tracks.
///
/// Constructed explicitly and shared through `Arc`. Every operation other than
/// [`initialize`](Self::initialize) and [`state`](Self::state) fails with
/// [`CacheError::NotReady`] until initialization completed.
///
/// # Example
///
/// ```rust,ignore
/// use core_cache::{CacheConfig, OfflineCache};
/// use std::sync::Arc;
///
/// let cache = Arc::new(OfflineCache::new(CacheConfig::default(), db_adapter));
/// cache.initialize().await?;
///
/// cache.admit(track_id.clone(), metadata, payload).await?;
/// if let Some(entry) = cache.fetch(&track_id).await? {
///     play(entry.payload);
/// }
/// ```
pub struct OfflineCache {
    config: CacheConfig,
    repository: Arc<dyn CacheEntryRepository>,
    clock: Arc<dyn Clock>,
    event_bus: Arc<EventBus>,
    ready: OnceCell<ReadyState>,
    initializing: AtomicUsize,
    admission_lock: Mutex<()>,
}

impl OfflineCache {
    /// Create a cache stored in the `cached_tracks` table of `db`.
    pub fn new(config: CacheConfig, db: Arc<dyn DatabaseAdapter>) -> Self {
        let repository = Arc::new(SqliteCacheEntryRepository::new(db));
        Self::with_repository(config, repository)
    }

    /// Create a cache over any repository implementation.
    pub fn with_repository(config: CacheConfig, repository: Arc<dyn CacheEntryRepository>) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size.max(1)));

        Self {
            config,
            repository,
            clock: Arc::new(SystemClock),
            event_bus,
            ready: OnceCell::new(),
            initializing: AtomicUsize::new(0),
            admission_lock: Mutex::new(()),
        }
    }

    /// Publish change notifications on a shared event bus.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Set the clock used for `cached_at` / `last_accessed_at` stamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn state(&self) -> CacheState {
        if self.ready.initialized() {
            CacheState::Ready
        } else if self.initializing.load(Ordering::SeqCst) > 0 {
            CacheState::Initializing
        } else {
            CacheState::Uninitialized
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create the schema if needed and resync the size total from the store.
    ///
    /// Idempotent. Concurrent callers share one initialization. A failed
    /// initialization leaves the cache uninitialized and may be retried.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        if self.ready.initialized() {
            debug!("Offline cache already initialized");
            return Ok(());
        }

        self.initializing.fetch_add(1, Ordering::SeqCst);
        let result = self.ready.get_or_try_init(|| self.bootstrap()).await;
        self.initializing.fetch_sub(1, Ordering::SeqCst);

        result.map(|_| ())
    }

    async fn bootstrap(&self) -> Result<ReadyState> {
        info!("Initializing offline cache");

        self.config.validate().map_err(CacheError::InvalidConfig)?;

        self.repository.initialize().await.map_err(|e| {
            error!("Failed to open offline cache store: {}", e);
            CacheError::StoreUnavailable { source: e }
        })?;

        let accountant = Arc::new(CapacityAccountant::new(self.config.max_cache_size_bytes));
        accountant
            .recompute_from_store(self.repository.as_ref())
            .await
            .map_err(|e| {
                error!("Failed to compute offline cache size: {}", e);
                CacheError::read(e)
            })?;

        if accountant.is_over_budget() {
            warn!(
                current_bytes = accountant.current_bytes(),
                max_bytes = accountant.max_bytes(),
                "Offline cache starts over budget; next admission will evict"
            );
        }

        let eviction = EvictionEngine::new(self.repository.clone(), accountant.clone());

        info!(
            "Offline cache ready: {} of {} bytes used",
            accountant.current_bytes(),
            accountant.max_bytes()
        );

        Ok(ReadyState {
            accountant,
            eviction,
        })
    }

    fn ready(&self) -> Result<&ReadyState> {
        self.ready.get().ok_or(CacheError::NotReady)
    }

    // ========================================================================
    // Admission and lookup
    // ========================================================================

    /// Store a track for offline playback, evicting other tracks if needed.
    ///
    /// Re-admitting an id replaces its metadata and payload but keeps its
    /// `cached_at` and access history. Eviction already performed is not rolled
    /// back if the write itself fails.
    ///
    /// A track larger than everything evictable is still admitted; the cache is
    /// then over budget until later admissions or a trim bring it back.
    #[instrument(skip(self, metadata, payload), fields(bytes = payload.len()))]
    pub async fn admit(&self, id: TrackId, metadata: TrackMetadata, payload: Bytes) -> Result<()> {
        let ready = self.ready()?;
        let entry = CacheEntry::new(id, metadata, payload, self.clock.unix_timestamp_millis());

        entry.validate().map_err(|message| CacheError::WriteFailed {
            id: entry.id.clone(),
            source: LibraryError::InvalidInput {
                field: "entry".to_string(),
                message,
            },
        })?;

        let _admission = self.admission_lock.lock().await;

        let existing = self.repository.size_of(&entry.id).await.map_err(|e| {
            error!("Failed to look up cached track {}: {}", entry.id, e);
            CacheError::write(&entry.id, e)
        })?;

        let shortfall = ready
            .accountant
            .shortfall(entry.byte_size, existing.unwrap_or(0));

        let mut evicted = false;
        if shortfall > 0 {
            match ready.eviction.evict(shortfall, Some(&entry.id)).await {
                Ok(report) => evicted = !report.is_empty(),
                Err(incomplete) => {
                    if !incomplete.partial.is_empty() {
                        self.notify(CacheEvent::StateChanged);
                    }
                    return Err(incomplete.error);
                }
            }
        }

        let replaced = match self.repository.upsert(&entry).await {
            Ok(replaced) => replaced,
            Err(e) => {
                error!("Failed to cache track {}: {}", entry.id, e);
                if evicted {
                    self.notify(CacheEvent::StateChanged);
                }
                return Err(CacheError::write(&entry.id, e));
            }
        };

        ready.accountant.reserve(entry.byte_size);
        if let Some(old_size) = replaced {
            ready.accountant.release(old_size);
        }

        info!(
            "Cached track {} ({} bytes, {} of {} bytes used)",
            entry.id,
            entry.byte_size,
            ready.accountant.current_bytes(),
            ready.accountant.max_bytes()
        );

        if ready.accountant.is_over_budget() {
            let current_bytes = ready.accountant.current_bytes();
            let max_bytes = ready.accountant.max_bytes();
            warn!(
                current_bytes,
                max_bytes, "Track {} left the offline cache over budget", entry.id
            );
            self.notify(CacheEvent::OverBudget {
                current_bytes,
                max_bytes,
            });
        }

        self.notify(CacheEvent::StateChanged);
        Ok(())
    }

    /// Read a cached track and record the access.
    ///
    /// The returned entry already reflects this read. A failure to record the
    /// access is logged and does not fail the read. A miss has no side effects.
    #[instrument(skip(self))]
    pub async fn fetch(&self, id: &TrackId) -> Result<Option<CacheEntry>> {
        self.ready()?;

        let found = self.repository.find_by_id(id).await.map_err(|e| {
            error!("Failed to read cached track {}: {}", id, e);
            CacheError::read(e)
        })?;

        let Some(mut entry) = found else {
            debug!("Cache miss for track {}", id);
            return Ok(None);
        };

        let accessed_at = self.clock.unix_timestamp_millis();
        match self.repository.touch(id, accessed_at).await {
            Ok(true) => entry.record_access(accessed_at),
            Ok(false) => debug!("Track {} was removed before its access was recorded", id),
            Err(e) => warn!("Failed to record access for track {}: {}", id, e),
        }

        Ok(Some(entry))
    }

    /// Whether `id` is cached. Does not count as an access.
    #[instrument(skip(self))]
    pub async fn contains(&self, id: &TrackId) -> Result<bool> {
        self.ready()?;
        self.repository.exists(id).await.map_err(CacheError::read)
    }

    /// Payload-free listing of cached tracks, least recently played first.
    #[instrument(skip(self))]
    pub async fn list_cached_tracks(&self) -> Result<Vec<CachedTrackSummary>> {
        self.ready()?;
        self.repository
            .list_by_access_recency()
            .await
            .map_err(CacheError::read)
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove one track. Returns `false` if it was not cached.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &TrackId) -> Result<bool> {
        let ready = self.ready()?;

        let removed = self.repository.delete(id).await.map_err(|e| {
            error!("Failed to remove cached track {}: {}", id, e);
            CacheError::delete(id, e)
        })?;

        let Some(bytes) = removed else {
            return Ok(false);
        };

        ready.accountant.release(bytes);
        info!("Removed cached track {} ({} bytes)", id, bytes);
        self.notify(CacheEvent::StateChanged);

        Ok(true)
    }

    /// Remove every cached track and resync the size total from the store.
    ///
    /// Runs under the admission lock, so the resynced total is zero unless the
    /// store was written behind the cache's back.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<ClearOutcome> {
        let ready = self.ready()?;
        let _admission = self.admission_lock.lock().await;
        info!("Clearing all cached tracks");

        let outcome = self.repository.clear().await.map_err(|e| {
            error!("Failed to clear offline cache: {}", e);
            CacheError::clear(e)
        })?;

        if let Err(e) = ready
            .accountant
            .recompute_from_store(self.repository.as_ref())
            .await
        {
            warn!("Failed to resync cache size after clear: {}", e);
            ready.accountant.release(outcome.bytes);
        }

        info!(
            "Cleared {} tracks ({} bytes) from cache",
            outcome.entries, outcome.bytes
        );
        self.notify(CacheEvent::StateChanged);

        Ok(outcome)
    }

    /// Run one eviction pass for `space_needed` bytes.
    #[instrument(skip(self))]
    pub async fn evict(&self, space_needed: u64) -> Result<EvictionReport> {
        let ready = self.ready()?;
        let _admission = self.admission_lock.lock().await;

        let pass = ready.eviction.evict(space_needed, None).await;
        self.finish_eviction(pass)
    }

    /// Evict until the cache is back under its ceiling.
    ///
    /// Lowering the ceiling with [`set_max_bytes`](Self::set_max_bytes) does
    /// not evict; this does.
    #[instrument(skip(self))]
    pub async fn trim_to_capacity(&self) -> Result<EvictionReport> {
        let ready = self.ready()?;
        let _admission = self.admission_lock.lock().await;

        let over = ready.accountant.shortfall(0, 0);
        if over == 0 {
            return Ok(EvictionReport::default());
        }

        let pass = ready.eviction.evict(over, None).await;
        self.finish_eviction(pass)
    }

    /// Announce any eviction that committed, even when the pass then failed.
    fn finish_eviction(
        &self,
        pass: std::result::Result<EvictionReport, IncompleteEviction>,
    ) -> Result<EvictionReport> {
        let evicted = match &pass {
            Ok(report) => !report.is_empty(),
            Err(incomplete) => !incomplete.partial.is_empty(),
        };
        if evicted {
            self.notify(CacheEvent::StateChanged);
        }

        pass.map_err(CacheError::from)
    }

    // ========================================================================
    // Capacity
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<CacheStats> {
        let ready = self.ready()?;
        let entry_count = self.repository.count().await.map_err(CacheError::read)?;

        Ok(CacheStats::new(
            entry_count,
            ready.accountant.current_bytes(),
            ready.accountant.max_bytes(),
        ))
    }

    /// Change the ceiling. Takes effect at the next admission or trim.
    pub fn set_max_bytes(&self, bytes: u64) -> Result<()> {
        let ready = self.ready()?;
        if bytes == 0 {
            return Err(CacheError::InvalidConfig(
                "max_bytes must be greater than 0".to_string(),
            ));
        }

        ready.accountant.set_max_bytes(bytes);
        info!("Offline cache ceiling set to {} bytes", bytes);
        Ok(())
    }

    /// `max - current`. Negative while over budget.
    pub fn available_bytes(&self) -> Result<i64> {
        Ok(self.ready()?.accountant.available())
    }

    pub fn max_bytes(&self) -> Result<u64> {
        Ok(self.ready()?.accountant.max_bytes())
    }

    pub fn current_bytes(&self) -> Result<u64> {
        Ok(self.ready()?.accountant.current_bytes())
    }

    fn notify(&self, event: CacheEvent) {
        if self.event_bus.emit(CoreEvent::Cache(event)).is_err() {
            debug!("No subscribers for offline cache event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{summary, MockRepo};
    use bridge_traits::BridgeError;
    use mockall::Sequence;
    use std::sync::atomic::AtomicU32;

    fn ready_repo(total_bytes: u64) -> MockRepo {
        let mut repo = MockRepo::new();
        repo.expect_initialize().returning(|| Ok(()));
        repo.expect_total_bytes().returning(move || Ok(total_bytes));
        repo
    }

    fn locked() -> LibraryError {
        LibraryError::Bridge(BridgeError::DatabaseError("database is locked".into()))
    }

    fn cache(repo: MockRepo, max: u64) -> OfflineCache {
        OfflineCache::with_repository(CacheConfig::new().with_max_size(max), Arc::new(repo))
    }

    #[tokio::test]
    async fn test_operations_fail_before_initialize() {
        let cache = cache(MockRepo::new(), 100);
        assert_eq!(cache.state(), CacheState::Uninitialized);

        let id = TrackId::new("t1");
        assert!(matches!(
            cache.admit(id.clone(), TrackMetadata::new(), Bytes::from_static(b"x")).await,
            Err(CacheError::NotReady)
        ));
        assert!(matches!(cache.fetch(&id).await, Err(CacheError::NotReady)));
        assert!(matches!(cache.contains(&id).await, Err(CacheError::NotReady)));
        assert!(matches!(cache.clear_all().await, Err(CacheError::NotReady)));
        assert!(matches!(cache.stats().await, Err(CacheError::NotReady)));
        assert!(matches!(cache.set_max_bytes(10), Err(CacheError::NotReady)));
        assert!(matches!(cache.available_bytes(), Err(CacheError::NotReady)));
    }

    #[tokio::test]
    async fn test_concurrent_initialize_runs_once() {
        let mut repo = MockRepo::new();
        repo.expect_initialize().times(1).returning(|| Ok(()));
        repo.expect_total_bytes().times(1).returning(|| Ok(42));

        let cache = Arc::new(cache(repo, 100));
        let (a, b) = tokio::join!(cache.initialize(), cache.initialize());
        a.unwrap();
        b.unwrap();
        cache.initialize().await.unwrap();

        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(cache.current_bytes().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_failed_initialize_can_be_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut repo = MockRepo::new();
        let seen = attempts.clone();
        repo.expect_initialize().returning(move || {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LibraryError::Bridge(BridgeError::ConnectionFailed(
                    "unable to open database file".into(),
                )))
            } else {
                Ok(())
            }
        });
        repo.expect_total_bytes().returning(|| Ok(0));

        let cache = cache(repo, 100);
        let err = cache.initialize().await.unwrap_err();
        assert!(matches!(err, CacheError::StoreUnavailable { .. }));
        assert_eq!(cache.state(), CacheState::Uninitialized);

        cache.initialize().await.unwrap();
        assert_eq!(cache.state(), CacheState::Ready);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_at_initialize() {
        let cache = OfflineCache::with_repository(
            CacheConfig::new().with_max_size(0),
            Arc::new(MockRepo::new()),
        );

        assert!(matches!(
            cache.initialize().await,
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_touch_failure_does_not_fail_fetch() {
        let mut repo = ready_repo(10);
        repo.expect_find_by_id().returning(|id| {
            Ok(Some(CacheEntry::new(
                id.clone(),
                TrackMetadata::new(),
                Bytes::from_static(b"0123456789"),
                1_000,
            )))
        });
        repo.expect_touch().times(1).returning(|_, _| Err(locked()));

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();

        let entry = cache.fetch(&TrackId::new("t1")).await.unwrap().unwrap();
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.last_accessed_at, None);
        assert_eq!(cache.current_bytes().unwrap(), 10);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_accounting_unchanged() {
        let mut repo = ready_repo(50);
        repo.expect_size_of().returning(|_| Ok(None));
        repo.expect_upsert().times(1).returning(|_| Err(locked()));

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();

        let err = cache
            .admit(TrackId::new("t1"), TrackMetadata::new(), Bytes::from_static(b"abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::WriteFailed { .. }));
        assert_eq!(cache.current_bytes().unwrap(), 50);
    }

    #[tokio::test]
    async fn test_eviction_is_kept_when_write_fails() {
        let mut repo = ready_repo(90);
        repo.expect_size_of().returning(|_| Ok(None));
        repo.expect_list_by_access_frequency()
            .returning(|| Ok(vec![summary("old", 90, 0, 100, 1)]));
        repo.expect_delete().times(1).returning(|_| Ok(Some(90)));
        repo.expect_upsert().returning(|_| Err(locked()));

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();
        let mut events = cache.event_bus().subscribe();

        let result = cache
            .admit(TrackId::new("new"), TrackMetadata::new(), Bytes::from(vec![0u8; 20]))
            .await;

        assert!(result.is_err());
        assert_eq!(cache.current_bytes().unwrap(), 0);
        assert_eq!(
            events.try_recv().unwrap(),
            CoreEvent::Cache(CacheEvent::StateChanged)
        );
    }

    fn half_evictable_repo() -> MockRepo {
        let mut repo = ready_repo(90);
        repo.expect_list_by_access_frequency().returning(|| {
            Ok(vec![
                summary("first", 10, 0, 100, 1),
                summary("broken", 80, 0, 200, 2),
            ])
        });
        repo.expect_delete()
            .withf(|id| id.as_str() == "first")
            .times(1)
            .returning(|_| Ok(Some(10)));
        repo.expect_delete()
            .withf(|id| id.as_str() == "broken")
            .returning(|_| Err(locked()));
        repo
    }

    #[tokio::test]
    async fn test_partial_eviction_on_admit_is_announced() {
        let mut repo = half_evictable_repo();
        repo.expect_size_of().returning(|_| Ok(None));
        repo.expect_upsert().times(0);

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();
        let mut events = cache.event_bus().subscribe();

        let err = cache
            .admit(TrackId::new("new"), TrackMetadata::new(), Bytes::from(vec![0u8; 50]))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::DeleteFailed { .. }));
        assert_eq!(cache.current_bytes().unwrap(), 80);
        assert_eq!(
            events.try_recv().unwrap(),
            CoreEvent::Cache(CacheEvent::StateChanged)
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_partial_trim_is_announced() {
        let cache = cache(half_evictable_repo(), 100);
        cache.initialize().await.unwrap();
        cache.set_max_bytes(50).unwrap();
        let mut events = cache.event_bus().subscribe();

        let err = cache.trim_to_capacity().await.unwrap_err();

        assert!(matches!(err, CacheError::DeleteFailed { .. }));
        assert_eq!(cache.current_bytes().unwrap(), 80);
        assert_eq!(
            events.try_recv().unwrap(),
            CoreEvent::Cache(CacheEvent::StateChanged)
        );
    }

    #[tokio::test]
    async fn test_failed_eviction_without_deletions_is_silent() {
        let mut repo = ready_repo(90);
        repo.expect_list_by_access_frequency()
            .returning(|| Ok(vec![summary("broken", 90, 0, 100, 1)]));
        repo.expect_delete().returning(|_| Err(locked()));

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();
        let mut events = cache.event_bus().subscribe();

        assert!(cache.evict(20).await.is_err());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_size_lookup_failure_on_admit_is_a_write_failure() {
        let mut repo = ready_repo(0);
        repo.expect_size_of().returning(|_| Err(locked()));
        repo.expect_upsert().times(0);

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();

        match cache
            .admit(TrackId::new("t1"), TrackMetadata::new(), Bytes::from_static(b"abc"))
            .await
        {
            Err(CacheError::WriteFailed { id, .. }) => assert_eq!(id.as_str(), "t1"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_resyncs_size_from_store() {
        let mut repo = MockRepo::new();
        let mut totals = Sequence::new();
        repo.expect_initialize().returning(|| Ok(()));
        repo.expect_total_bytes()
            .times(1)
            .in_sequence(&mut totals)
            .returning(|| Ok(70));
        repo.expect_total_bytes()
            .times(1)
            .in_sequence(&mut totals)
            .returning(|| Ok(0));
        // The store only saw 40 of the 70 bytes the total claims
        repo.expect_clear().returning(|| {
            Ok(ClearOutcome {
                entries: 2,
                bytes: 40,
            })
        });

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();

        cache.clear_all().await.unwrap();
        assert_eq!(cache.current_bytes().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_entry_is_rejected_before_eviction() {
        let repo = ready_repo(100);

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();

        let err = cache
            .admit(TrackId::new("  "), TrackMetadata::new(), Bytes::from_static(b"abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::WriteFailed { .. }));
        assert_eq!(cache.current_bytes().unwrap(), 100);
    }

    #[tokio::test]
    async fn test_unreachable_store_on_admit_is_store_unavailable() {
        let mut repo = ready_repo(0);
        repo.expect_size_of().returning(|_| {
            Err(LibraryError::Bridge(BridgeError::ConnectionFailed(
                "pool timed out".into(),
            )))
        });

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();

        let err = cache
            .admit(TrackId::new("t1"), TrackMetadata::new(), Bytes::from_static(b"abc"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_accounting() {
        let mut repo = ready_repo(70);
        repo.expect_clear().returning(|| Err(locked()));

        let cache = cache(repo, 100);
        cache.initialize().await.unwrap();

        assert!(matches!(
            cache.clear_all().await,
            Err(CacheError::ClearFailed { .. })
        ));
        assert_eq!(cache.current_bytes().unwrap(), 70);
    }

    #[tokio::test]
    async fn test_set_max_bytes_rejects_zero() {
        let cache = cache(ready_repo(0), 100);
        cache.initialize().await.unwrap();

        assert!(matches!(
            cache.set_max_bytes(0),
            Err(CacheError::InvalidConfig(_))
        ));
        assert_eq!(cache.max_bytes().unwrap(), 100);

        cache.set_max_bytes(40).unwrap();
        assert_eq!(cache.max_bytes().unwrap(), 40);
        assert_eq!(cache.available_bytes().unwrap(), 40);
    }
}
