//! # Capacity Accountant
//!
//! Running total of cached bytes against the configured ceiling.
//!
//! The total is a cache of what the store holds. It is adjusted incrementally
//! by `reserve`/`release` after each committed store mutation, and overwritten
//! only by [`CapacityAccountant::recompute_from_store`] at initialization and
//! after a full clear, which repairs drift left by an unclean shutdown or
//! external tampering.

use core_library::{CacheEntryRepository, Result};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tracing::{debug, info};

#[derive(Debug)]
pub struct CapacityAccountant {
    current: AtomicI64,
    max: AtomicU64,
}

impl CapacityAccountant {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            current: AtomicI64::new(0),
            max: AtomicU64::new(max_bytes),
        }
    }

    /// Sum `byte_size` over every stored entry and make that the running total.
    pub async fn recompute_from_store(&self, repository: &dyn CacheEntryRepository) -> Result<u64> {
        let total = repository.total_bytes().await?;
        let previous = self.current.swap(to_signed(total), Ordering::SeqCst);

        if previous != to_signed(total) {
            info!(
                previous_bytes = previous,
                stored_bytes = total,
                "Resynchronized cache size from store"
            );
        }

        Ok(total)
    }

    pub fn reserve(&self, bytes: u64) {
        let after = self.current.fetch_add(to_signed(bytes), Ordering::SeqCst) + to_signed(bytes);
        debug!(bytes, current_bytes = after, "Reserved cache bytes");
    }

    pub fn release(&self, bytes: u64) {
        let after = self.current.fetch_sub(to_signed(bytes), Ordering::SeqCst) - to_signed(bytes);
        debug!(bytes, current_bytes = after, "Released cache bytes");
    }

    /// `max - current`. Negative while the cache is over budget.
    pub fn available(&self) -> i64 {
        to_signed(self.max_bytes()).saturating_sub(self.current.load(Ordering::SeqCst))
    }

    /// Changes the ceiling. Never evicts by itself.
    pub fn set_max_bytes(&self, bytes: u64) {
        self.max.store(bytes, Ordering::SeqCst);
    }

    pub fn current_bytes(&self) -> u64 {
        self.current.load(Ordering::SeqCst).max(0) as u64
    }

    pub fn max_bytes(&self) -> u64 {
        self.max.load(Ordering::SeqCst)
    }

    pub fn is_over_budget(&self) -> bool {
        self.available() < 0
    }

    /// Bytes that must be evicted before `incoming` bytes fit, given that the
    /// write will also drop `replacing` bytes of an existing entry.
    pub fn shortfall(&self, incoming: u64, replacing: u64) -> u64 {
        let over = self
            .current
            .load(Ordering::SeqCst)
            .saturating_sub(to_signed(replacing))
            .saturating_add(to_signed(incoming))
            .saturating_sub(to_signed(self.max_bytes()));
        over.max(0) as u64
    }
}

fn to_signed(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}
