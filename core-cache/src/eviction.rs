//! # Eviction Policy Engine
//!
//! Hybrid LFU/LRU eviction: entries are removed least-frequently-used first,
//! and among equally used entries the oldest admission goes first. Ties on
//! `cached_at` fall back to store insertion order.

use crate::accountant::CapacityAccountant;
use crate::error::CacheError;
use core_library::{CacheEntryRepository, CachedTrackSummary, TrackId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionReport {
    /// Bytes the store actually deleted during the pass
    pub bytes_freed: u64,
    /// Evicted ids, in eviction order
    pub evicted: Vec<TrackId>,
}

impl EvictionReport {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty()
    }
}

/// A pass that stopped on an error after possibly evicting some entries.
#[derive(Debug)]
pub struct IncompleteEviction {
    /// Deletions that committed before the failure
    pub partial: EvictionReport,
    pub error: CacheError,
}

impl IncompleteEviction {
    fn new(partial: EvictionReport, error: CacheError) -> Self {
        Self { partial, error }
    }
}

impl From<IncompleteEviction> for CacheError {
    fn from(incomplete: IncompleteEviction) -> Self {
        incomplete.error
    }
}

pub struct EvictionEngine {
    repository: Arc<dyn CacheEntryRepository>,
    accountant: Arc<CapacityAccountant>,
    pass_lock: Mutex<()>,
}

impl EvictionEngine {
    pub fn new(
        repository: Arc<dyn CacheEntryRepository>,
        accountant: Arc<CapacityAccountant>,
    ) -> Self {
        Self {
            repository,
            accountant,
            pass_lock: Mutex::new(()),
        }
    }

    /// Evict entries until at least `space_needed` bytes were freed or nothing
    /// evictable is left.
    ///
    /// `protected` is never evicted. Every deletion is paired with a release on
    /// the accountant. A failed deletion stops the pass; deletions and releases
    /// already applied stay applied and are returned in
    /// [`IncompleteEviction::partial`].
    #[instrument(skip(self))]
    pub async fn evict(
        &self,
        space_needed: u64,
        protected: Option<&TrackId>,
    ) -> Result<EvictionReport, IncompleteEviction> {
        let mut report = EvictionReport::default();
        if space_needed == 0 {
            return Ok(report);
        }

        let _pass = self.pass_lock.lock().await;
        info!("Evicting tracks to free {} bytes", space_needed);

        let mut candidates = self
            .repository
            .list_by_access_frequency()
            .await
            .map_err(|e| {
                error!("Failed to snapshot cache entries for eviction: {}", e);
                IncompleteEviction::new(EvictionReport::default(), CacheError::read(e))
            })?;
        order_for_eviction(&mut candidates);

        for candidate in candidates {
            if report.bytes_freed >= space_needed {
                break;
            }

            if protected == Some(&candidate.id) {
                continue;
            }

            match self.repository.delete(&candidate.id).await {
                Ok(Some(bytes)) => {
                    self.accountant.release(bytes);
                    report.bytes_freed += bytes;
                    info!(
                        "Evicted track {} ({} bytes, {} accesses), total freed: {} bytes",
                        candidate.id, bytes, candidate.access_count, report.bytes_freed
                    );
                    report.evicted.push(candidate.id);
                }
                Ok(None) => {
                    debug!("Track {} already removed, skipping", candidate.id);
                }
                Err(e) => {
                    error!(
                        "Failed to evict track {} after freeing {} bytes: {}",
                        candidate.id, report.bytes_freed, e
                    );
                    let error = CacheError::delete(&candidate.id, e);
                    return Err(IncompleteEviction::new(report, error));
                }
            }
        }

        if report.bytes_freed < space_needed {
            warn!(
                "No more tracks available for eviction: freed {} of {} bytes",
                report.bytes_freed, space_needed
            );
        }

        info!(
            "Eviction complete: {} tracks removed, {} bytes freed",
            report.evicted.len(),
            report.bytes_freed
        );

        Ok(report)
    }
}

/// Least accessed first, then oldest admission, then insertion order.
pub fn order_for_eviction(candidates: &mut [CachedTrackSummary]) {
    candidates.sort_by_key(CachedTrackSummary::eviction_key);
}
