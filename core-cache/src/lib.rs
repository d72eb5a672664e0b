//! # Offline Cache
//!
//! Bounded, persistent cache of downloaded tracks for offline playback.
//!
//! ## Overview
//!
//! - **Size ceiling**: admissions evict other tracks to stay under
//!   `max_cache_size_bytes` (default 500 MiB)
//! - **Hybrid LFU/LRU eviction**: least played tracks go first, oldest first
//!   among equally played ones
//! - **Access accounting**: every successful read bumps the access count
//! - **Crash recovery**: the size total is recomputed from the store on startup
//! - **Change events**: `CacheEvent::StateChanged` on the shared event bus
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                OfflineCache                  │
//! │  (lifecycle, admission, fetch, clear, stats) │
//! └───┬──────────────────┬───────────────────┬───┘
//!     │                  │                   │
//!     ▼                  ▼                   ▼
//! ┌───────────┐  ┌────────────────┐  ┌──────────────┐
//! │ Capacity  │◄─┤ EvictionEngine │  │   EventBus   │
//! │ Accountant│  └───────┬────────┘  └──────────────┘
//! └───────────┘          │
//!                        ▼
//!             ┌─────────────────────┐
//!             │ CacheEntryRepository│
//!             │   (cached_tracks)   │
//!             └─────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_cache::{CacheConfig, OfflineCache};
//! use core_library::adapters::SqliteAdapter;
//! use bridge_traits::database::DatabaseConfig;
//! use std::sync::Arc;
//!
//! let db = Arc::new(SqliteAdapter::new(DatabaseConfig::new("offline.db")).await?);
//! let cache = Arc::new(OfflineCache::new(
//!     CacheConfig::new().with_max_size(200 * 1024 * 1024),
//!     db,
//! ));
//! cache.initialize().await?;
//!
//! cache.admit(track_id.clone(), metadata, payload).await?;
//! let stats = cache.stats().await?;
//! println!("{:.1}% used", stats.percent_used);
//! ```

pub mod accountant;
pub mod config;
pub mod error;
pub mod eviction;
pub mod manager;
pub mod stats;

#[cfg(test)]
mod testing;

pub use accountant::CapacityAccountant;
pub use config::{CacheConfig, DEFAULT_MAX_CACHE_SIZE_BYTES};
pub use error::{CacheError, Result};
pub use eviction::{EvictionEngine, EvictionReport, IncompleteEviction};
pub use manager::{CacheState, OfflineCache};
pub use stats::CacheStats;
