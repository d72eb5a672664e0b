//! # Host Bridge Traits
//!
//! Contracts between the offline cache core and the host-provided capabilities
//! it is built on.
//!
//! ## Traits
//!
//! ### Storage
//! - [`DatabaseAdapter`](database::DatabaseAdapter) - Durable, transactional store
//!   holding the cached tracks table and its secondary indexes
//! - [`DatabaseTransaction`](database::DatabaseTransaction) - One atomic unit of
//!   work pinned to a single connection
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters
//! should report failures to open the store or acquire a connection as
//! [`BridgeError::ConnectionFailed`] so callers can tell an unavailable store
//! apart from a statement that failed to commit.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared
//! behind an `Arc` by every cache caller.

pub mod database;
pub mod error;
pub mod time;

pub use error::BridgeError;

pub use database::{
    DatabaseAdapter, DatabaseConfig, DatabaseStatistics, DatabaseTransaction, QueryRow,
    QueryValue,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
