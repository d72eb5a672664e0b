//! Cache statistics and monitoring

use serde::{Deserialize, Serialize};

/// Point-in-time statistics about the offline cache. Derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached tracks
    pub entry_count: u64,

    /// Bytes currently accounted to cached tracks
    pub current_bytes: u64,

    /// Configured ceiling in bytes
    pub max_bytes: u64,

    /// `current_bytes` as a percentage of `max_bytes`. Exceeds 100 when over budget.
    pub percent_used: f64,
}

impl CacheStats {
    pub fn new(entry_count: u64, current_bytes: u64, max_bytes: u64) -> Self {
        let percent_used = if max_bytes == 0 {
            0.0
        } else {
            (current_bytes as f64 / max_bytes as f64) * 100.0
        };

        Self {
            entry_count,
            current_bytes,
            max_bytes,
            percent_used,
        }
    }

    /// Returns true if the cache is near capacity (>90%).
    pub fn is_near_capacity(&self) -> bool {
        self.percent_used > 90.0
    }

    /// Returns true if the cache is full (>=100%).
    pub fn is_full(&self) -> bool {
        self.current_bytes >= self.max_bytes
    }

    /// Bytes that would have to be evicted to get back under the ceiling.
    pub fn space_needed(&self) -> u64 {
        self.current_bytes.saturating_sub(self.max_bytes)
    }

    /// Returns average bytes per cached track.
    pub fn average_entry_size(&self) -> u64 {
        if self.entry_count == 0 {
            0
        } else {
            self.current_bytes / self.entry_count
        }
    }
}
