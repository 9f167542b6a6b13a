use duckdb::{AccessMode, Config, Connection};
use r2d2::ManageConnection;
use std::sync::Mutex;
use tracing::info;

/// Hands out connections that all share one DuckDB database instance.
///
/// Pooled connections are clones of a root connection, so an in-memory
/// database (`:memory:`) is visible to every connection in the pool.
pub struct DuckDBConnectionManager {
    connection_string: String,
    root: Mutex<Connection>,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String, read_only: bool) -> Result<Self, duckdb::Error> {
        let root = if connection_string.is_empty() || connection_string == ":memory:" {
            Connection::open_in_memory()?
        } else if read_only {
            let config = Config::default().access_mode(AccessMode::ReadOnly)?;
            Connection::open_with_flags(&connection_string, config)?
        } else {
            Connection::open(&connection_string)?
        };

        info!(
            "Opened DuckDB database '{}' (read_only: {})",
            connection_string, read_only
        );

        Ok(Self {
            connection_string,
            root: Mutex::new(root),
        })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let root = self.root.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        root.try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
