//! Cache configuration

use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Default cache ceiling: 500 MiB.
pub const DEFAULT_MAX_CACHE_SIZE_BYTES: u64 = 500 * 1024 * 1024;

/// Configuration for the offline cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum cache size in bytes (default: 500 MiB)
    pub max_cache_size_bytes: u64,

    /// Buffer size of the event bus the cache creates when none is injected
    pub event_buffer_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size_bytes: DEFAULT_MAX_CACHE_SIZE_BYTES,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum cache size.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_cache_size_bytes = bytes;
        self
    }

    /// Set the event bus buffer size.
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_cache_size_bytes == 0 {
            return Err("max_cache_size_bytes must be greater than 0".to_string());
        }

        if self.event_buffer_size == 0 {
            return Err("event_buffer_size must be at least 1".to_string());
        }

        Ok(())
    }
}
