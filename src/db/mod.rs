pub mod backend;
pub mod db_pool;
pub mod schema_manager;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),
    /// The engine rejected or failed the statement; the message is the engine's own
    #[error("{0}")]
    Query(String),
    #[error("Result serialization error: {0}")]
    Serialization(String),
}

/// Tabular result handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

/// Everything the pipeline needs from the database engine.
///
/// Calls block; async callers run them on the blocking pool.
pub trait QueryBackend: Send + Sync {
    /// Ordered `(column_name, declared_type)` pairs of `table`
    fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>, DbError>;

    fn execute(&self, sql: &str) -> Result<QueryResult, DbError>;

    /// Rendered query plan, used for row estimates only
    fn explain(&self, sql: &str) -> Result<String, DbError>;

    fn export_csv(&self, sql: &str) -> Result<Vec<u8>, DbError>;
}
