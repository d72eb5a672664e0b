//! Native SQLite Database Adapter
//!
//! Implements the `DatabaseAdapter` trait using `sqlx` with the native SQLite driver.
//!
//! ## Features
//!
//! - Connection pooling with configurable limits
//! - WAL mode for concurrent readers alongside a writer
//! - Prepared statement caching
//! - Transactions pinned to a dedicated connection
//! - In-memory databases kept alive on a single long-lived connection

use async_trait::async_trait;
use bridge_traits::database::{
    DatabaseAdapter, DatabaseConfig, DatabaseStatistics, DatabaseTransaction, QueryRow, QueryValue,
};
use bridge_traits::error::{BridgeError, Result};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Pool, Row, Sqlite, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Native SQLite implementation of DatabaseAdapter
///
/// This adapter wraps a `sqlx::Pool<Sqlite>` and implements all database
/// operations using the native SQLite driver.
pub struct SqliteAdapter {
    pool: Pool<Sqlite>,
    transaction_counter: Arc<AtomicU64>,
    config: DatabaseConfig,
}

impl SqliteAdapter {
    /// Create a new SqliteAdapter with the given configuration
    ///
    /// Establishes the connection pool and configures SQLite options. The
    /// cache schema itself is created by the repository.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ConnectionFailed`] if the database cannot be
    /// opened.
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!(
            database_url = %config.database_url,
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            "Creating SQLite database adapter"
        );

        let mut connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| BridgeError::ConnectionFailed(format!("Invalid database URL: {}", e)))?;

        connect_options = connect_options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true)
            // 64MB page cache
            .pragma("cache_size", "-64000")
            // Payload blobs make the file grow and shrink; reclaim pages incrementally
            .pragma("auto_vacuum", "INCREMENTAL");

        if config.enable_cache {
            connect_options = connect_options.statement_cache_capacity(config.cache_capacity);
        }

        debug!("SQLite connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

        // Each in-memory connection is its own database. Never recycle the one we have.
        if config.is_in_memory() {
            pool_options = pool_options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                BridgeError::ConnectionFailed(format!("Connection pool creation failed: {}", e))
            })?;

        info!(
            connections = pool.size(),
            "SQLite connection pool created successfully"
        );

        Ok(Self {
            pool,
            transaction_counter: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    /// Convert a sqlx Row to a QueryRow (HashMap)
    fn row_to_query_row(row: &SqliteRow) -> QueryRow {
        let mut result = HashMap::new();

        for column in row.columns() {
            let column_name = column.name().to_string();

            let value = if let Ok(v) = row.try_get::<Option<i64>, _>(column.ordinal()) {
                v.map(QueryValue::Integer).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(column.ordinal()) {
                v.map(QueryValue::Real).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<String>, _>(column.ordinal()) {
                v.map(QueryValue::Text).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(column.ordinal()) {
                v.map(QueryValue::Blob).unwrap_or(QueryValue::Null)
            } else {
                QueryValue::Null
            };

            result.insert(column_name, value);
        }

        result
    }

    /// Convert QueryValue parameters to sqlx-compatible format
    fn bind_params<'q>(query: SqliteQuery<'q>, params: &'q [QueryValue]) -> SqliteQuery<'q> {
        let mut query = query;
        for param in params {
            query = match param {
                QueryValue::Null => query.bind(None::<i64>),
                QueryValue::Integer(i) => query.bind(*i),
                QueryValue::Real(r) => query.bind(*r),
                QueryValue::Text(s) => query.bind(s.as_str()),
                QueryValue::Blob(b) => query.bind(b.as_slice()),
            };
        }
        query
    }
}

/// Pool exhaustion or a closed pool means the store is unreachable; anything
/// else is a statement failure.
fn map_sqlx_error(context: &str, err: sqlx::Error) -> BridgeError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            BridgeError::ConnectionFailed(format!("{}: {}", context, err))
        }
        other => BridgeError::DatabaseError(format!("{}: {}", context, other)),
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn health_check(&self) -> Result<()> {
        debug!("Performing database health check");

        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database health check failed");
                BridgeError::ConnectionFailed(format!("Health check failed: {}", e))
            })?;

        debug!("Database health check passed");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Closing database connection pool");
        self.pool.close().await;
        Ok(())
    }

    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query");

        let rows = Self::bind_params(sqlx::query(query), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Query failed", e))?;

        let result: Vec<QueryRow> = rows.iter().map(Self::row_to_query_row).collect();

        debug!(row_count = result.len(), "Query executed successfully");
        Ok(result)
    }

    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query_one_optional");

        let row = Self::bind_params(sqlx::query(query), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Query one optional failed", e))?;

        Ok(row.as_ref().map(Self::row_to_query_row))
    }

    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64> {
        debug!(statement = %statement, param_count = params.len(), "Executing statement");

        let result = Self::bind_params(sqlx::query(statement), params)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Execute failed", e))?;

        let rows_affected = result.rows_affected();
        debug!(rows_affected, "Statement executed successfully");

        Ok(rows_affected)
    }

    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>> {
        debug!(batch_size = statements.len(), "Executing batch");

        let mut tx = self.begin_transaction().await?;
        let mut results = Vec::with_capacity(statements.len());

        for (statement, params) in statements {
            match tx.execute(statement, params).await {
                Ok(rows_affected) => results.push(rows_affected),
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "Rollback after failed batch statement failed");
                    }
                    return Err(e);
                }
            }
        }

        tx.commit().await?;

        debug!(results = ?results, "Batch executed successfully");
        Ok(results)
    }

    async fn begin_transaction(&self) -> Result<Box<dyn DatabaseTransaction>> {
        let id = self.transaction_counter.fetch_add(1, Ordering::SeqCst);
        debug!(transaction_id = id, "Beginning transaction");

        let tx = self.pool.begin().await.map_err(|e| {
            warn!(transaction_id = id, error = %e, "Failed to begin transaction");
            BridgeError::ConnectionFailed(format!("Begin transaction failed: {}", e))
        })?;

        Ok(Box::new(SqliteTransaction { id, tx }))
    }

    async fn get_statistics(&self) -> Result<DatabaseStatistics> {
        let total_connections = self.pool.size();
        let idle_connections = self.pool.num_idle() as u32;
        let active_connections = total_connections.saturating_sub(idle_connections);

        let size_query =
            "SELECT page_count * page_size as size FROM pragma_page_count(), pragma_page_size()";
        let database_size_bytes = self
            .query_one_optional(size_query, &[])
            .await
            .ok()
            .flatten()
            .and_then(|row| row.get("size").and_then(|v| v.as_i64()))
            .map(|v| v as u64);

        Ok(DatabaseStatistics {
            total_connections,
            idle_connections,
            active_connections,
            database_size_bytes,
            cached_statements: self.config.cache_capacity,
        })
    }
}

/// A sqlx transaction holding its pooled connection until commit or rollback.
///
/// Dropping it uncommitted rolls back (sqlx issues the ROLLBACK on drop).
pub struct SqliteTransaction {
    id: u64,
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl DatabaseTransaction for SqliteTransaction {
    async fn query(&mut self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>> {
        debug!(transaction_id = self.id, query = %query, "Executing query in transaction");

        let rows = SqliteAdapter::bind_params(sqlx::query(query), params)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Query in transaction failed", e))?;

        Ok(rows.iter().map(SqliteAdapter::row_to_query_row).collect())
    }

    async fn execute(&mut self, statement: &str, params: &[QueryValue]) -> Result<u64> {
        debug!(transaction_id = self.id, statement = %statement, "Executing statement in transaction");

        let result = SqliteAdapter::bind_params(sqlx::query(statement), params)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Execute in transaction failed", e))?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let id = self.id;
        debug!(transaction_id = id, "Committing transaction");

        self.tx.commit().await.map_err(|e| {
            warn!(transaction_id = id, error = %e, "Commit failed");
            map_sqlx_error("Commit transaction failed", e)
        })
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let id = self.id;
        debug!(transaction_id = id, "Rolling back transaction");

        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("Rollback transaction failed", e))
    }
}
