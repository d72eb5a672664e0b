//! Workspace entry crate.
//!
//! Host applications depend on `mpc-offline-cache` and get the offline cache
//! facade together with the bridge contracts and runtime helpers it needs,
//! without wiring each workspace crate individually.
//!
//! ```rust,ignore
//! use mpc_offline_cache::prelude::*;
//! use std::sync::Arc;
//!
//! let adapter = SqliteAdapter::new(DatabaseConfig::new("offline.db")).await?;
//! let cache = Arc::new(OfflineCache::new(CacheConfig::default(), Arc::new(adapter)));
//! cache.initialize().await?;
//! ```

pub use bridge_traits;
pub use core_cache;
pub use core_library;
pub use core_runtime;

/// Commonly used types for wiring the offline cache into a host.
pub mod prelude {
    pub use bridge_traits::database::{DatabaseAdapter, DatabaseConfig};
    pub use bridge_traits::time::{Clock, SystemClock};
    pub use core_cache::{
        CacheConfig, CacheError, CacheState, CacheStats, EvictionReport, OfflineCache,
    };
    pub use core_library::adapters::SqliteAdapter;
    pub use core_library::models::{CacheEntry, CachedTrackSummary, TrackId, TrackMetadata};
    pub use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
}
