//! # Offline Track Storage
//!
//! Owns the persistent side of the offline cache: the cached-track model,
//! the repository over the `cached_tracks` table, and the native SQLite
//! adapter it runs on.
//!
//! ## Overview
//!
//! This module manages:
//! - The `cached_tracks` schema and its frequency/recency indexes
//! - Repository access for admission, lookup, access accounting and eviction
//! - The sqlx-backed `DatabaseAdapter` implementation

pub mod adapters;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{CacheEntry, CachedTrackSummary, ClearOutcome, TrackId, TrackMetadata};
pub use repositories::{CacheEntryRepository, SqliteCacheEntryRepository};
