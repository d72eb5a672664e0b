//! Persistent Store Abstraction
//!
//! Provides a platform-agnostic trait for the durable, transactional storage
//! engine the offline cache is built on:
//! - Native: SQLite via sqlx (`core_library::adapters::SqliteAdapter`)
//! - Tests: the same adapter over an in-memory database
//!
//! ## Design Philosophy
//!
//! The cache never talks to a driver directly. Every statement goes through
//! [`DatabaseAdapter`], and every multi-statement unit of work that must be
//! atomic goes through a [`DatabaseTransaction`] obtained from
//! [`DatabaseAdapter::begin_transaction`]. A transaction owns its connection
//! for its whole lifetime, so statements issued through it can never land on
//! another pooled connection.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::database::{DatabaseAdapter, QueryValue};
//!
//! let mut tx = adapter.begin_transaction().await?;
//! let rows = tx
//!     .query("SELECT byte_size FROM cached_tracks WHERE id = ?", &[QueryValue::Text(id)])
//!     .await?;
//! tx.execute("DELETE FROM cached_tracks WHERE id = ?", &[QueryValue::Text(id)]).await?;
//! tx.commit().await?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

// =============================================================================
// Configuration
// =============================================================================

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Database configuration for opening the persistent store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or connection string
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,

    /// Enable statement caching
    pub enable_cache: bool,

    /// Statement cache capacity
    pub cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 30,
            enable_cache: true,
            cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database
    ///
    /// An in-memory database lives inside a single connection, so the pool is
    /// pinned to exactly one connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout_secs: 30,
            enable_cache: true,
            cache_capacity: 100,
        }
    }

    /// Set the maximum number of pooled connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Returns `true` if this configuration points at an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.database_url == IN_MEMORY_URL || self.database_url.contains(":memory:")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

// =============================================================================
// Query Values
// =============================================================================

/// Represents a single row from a database query as a map of column names to values
pub type QueryRow = std::collections::HashMap<String, QueryValue>;

/// Represents a database value that can be null, integer, real, text, or blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl QueryValue {
    /// Convert to i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            QueryValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Real(r) => Some(*r),
            QueryValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Convert to &str if possible
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert to String (owned) if possible
    pub fn as_string(&self) -> Option<String> {
        match self {
            QueryValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Convert to bytes if possible
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            QueryValue::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Take ownership of the blob contents, if this is a blob
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            QueryValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<Vec<u8>> for QueryValue {
    fn from(value: Vec<u8>) -> Self {
        QueryValue::Blob(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryValue::Null)
    }
}

// =============================================================================
// Database Adapter Trait
// =============================================================================

/// Database adapter trait for the persistent store
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the cache shares one adapter across
/// every concurrent caller.
///
/// ## Error Handling
///
/// Failures to reach the store are reported as
/// [`BridgeError::ConnectionFailed`](crate::BridgeError::ConnectionFailed);
/// statements that run but fail are reported as
/// [`BridgeError::DatabaseError`](crate::BridgeError::DatabaseError).
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Check if the database connection is healthy
    async fn health_check(&self) -> Result<()>;

    /// Close all database connections
    async fn close(&self) -> Result<()>;

    // =========================================================================
    // Raw Query Execution
    // =========================================================================

    /// Execute a query and return rows
    ///
    /// Implementations must use parameterized queries. Never concatenate
    /// caller-supplied values into the query string.
    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>>;

    /// Execute a query and return a single optional row
    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>>;

    /// Execute a statement that doesn't return rows (INSERT, UPDATE, DELETE)
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64>;

    /// Execute multiple statements atomically
    ///
    /// Either every statement commits or none does. Returns one row count per
    /// statement.
    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>>;

    // =========================================================================
    // Transaction Support
    // =========================================================================

    /// Begin a new transaction on a dedicated connection
    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>>;

    // =========================================================================
    // Utility Methods
    // =========================================================================

    /// Get detailed statistics about the database
    async fn get_statistics(&self) -> Result<DatabaseStatistics>;
}

/// A single atomic unit of work against the store.
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls it back.
#[async_trait::async_trait]
pub trait DatabaseTransaction: Send {
    /// Execute a query inside this transaction
    async fn query(&mut self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>>;

    /// Execute a statement inside this transaction
    async fn execute(&mut self, statement: &str, params: &[QueryValue]) -> Result<u64>;

    /// Commit every statement issued through this transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every statement issued through this transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Database statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStatistics {
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Number of active connections
    pub active_connections: u32,
    /// Database file size in bytes (if applicable)
    pub database_size_bytes: Option<u64>,
    /// Number of cached prepared statements
    pub cached_statements: usize,
}
