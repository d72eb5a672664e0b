//! # Repository Pattern Implementation
//!
//! Repository traits and implementations for data access.
//!
//! ## Architecture
//!
//! - Traits define the interface, so the cache can be driven against mocks
//! - SQLite implementations go through the `DatabaseAdapter` bridge
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `CacheEntryRepository` - Cached tracks with payloads and access accounting

pub mod cache;

pub use cache::{CacheEntryRepository, SqliteCacheEntryRepository};
