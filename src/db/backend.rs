use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::{DbError, QueryBackend, QueryResult};
use arrow::record_batch::RecordBatch;
use r2d2::{Pool, PooledConnection};
use std::time::Instant;
use tracing::{debug, error, info};

/// DuckDB implementation of [`QueryBackend`] over an r2d2 pool
pub struct DuckDbBackend {
    pool: Pool<DuckDBConnectionManager>,
}

impl DuckDbBackend {
    pub fn new(pool: Pool<DuckDBConnectionManager>) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<DuckDBConnectionManager>, DbError> {
        self.pool.get().map_err(|e| {
            error!("Failed to get DB connection: {}", e);
            DbError::Connection(e.to_string())
        })
    }

    // Run the statement and collect its Arrow batches along with column names
    fn query_batches(&self, sql: &str) -> Result<(Vec<String>, Vec<RecordBatch>), DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(|e| {
            error!("Failed to prepare query: {}", e);
            DbError::Query(e.to_string())
        })?;

        let arrow_batch = stmt.query_arrow([]).map_err(|e| {
            error!("Failed to execute query: {}", e);
            DbError::Query(e.to_string())
        })?;

        let schema = arrow_batch.get_schema();
        let columns = schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect::<Vec<String>>();

        let record_batches = arrow_batch.collect::<Vec<_>>();
        Ok((columns, record_batches))
    }
}

// Arrow batches -> row-major JSON values. Columns are read by position, so
// duplicate names (self-joins, repeated aggregates) keep their own values.
fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Vec<serde_json::Value>>, DbError> {
    let mut rows = Vec::new();
    for batch in batches {
        let mut batch_rows = vec![Vec::with_capacity(batch.num_columns()); batch.num_rows()];
        for index in 0..batch.num_columns() {
            let values = column_values(batch, index)?;
            for (row, value) in batch_rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        rows.extend(batch_rows);
    }
    Ok(rows)
}

fn column_values(batch: &RecordBatch, index: usize) -> Result<Vec<serde_json::Value>, DbError> {
    let single = batch
        .project(&[index])
        .map_err(|e| DbError::Serialization(e.to_string()))?;

    let mut writer = arrow::json::ArrayWriter::new(Vec::new());
    writer
        .write(&single)
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| DbError::Serialization(e.to_string()))?;

    let buffer = writer.into_inner();
    if buffer.is_empty() {
        return Ok(vec![serde_json::Value::Null; batch.num_rows()]);
    }

    let objects: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(&buffer).map_err(|e| DbError::Serialization(e.to_string()))?;

    // Nulls are omitted by the JSON writer, leaving an empty object
    Ok(objects
        .into_iter()
        .map(|object| {
            object
                .into_iter()
                .next()
                .map(|(_, value)| value)
                .unwrap_or(serde_json::Value::Null)
        })
        .collect())
}

impl QueryBackend for DuckDbBackend {
    fn describe_table(&self, table: &str) -> Result<Vec<(String, String)>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("DESCRIBE {}", table))
            .map_err(|e| DbError::Query(e.to_string()))?;

        let columns = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| DbError::Query(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!("Found {} columns in table {}", columns.len(), table);
        Ok(columns)
    }

    fn execute(&self, sql: &str) -> Result<QueryResult, DbError> {
        let start_time = Instant::now();
        info!("Executing SQL query: {}", sql);

        let (columns, batches) = self.query_batches(sql)?;
        let rows = batches_to_rows(&batches)?;
        let row_count = rows.len();
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Query executed successfully. Row count: {}, Execution time: {}ms",
            row_count, execution_time_ms
        );

        Ok(QueryResult {
            columns,
            rows,
            row_count,
            execution_time_ms,
        })
    }

    fn explain(&self, sql: &str) -> Result<String, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("EXPLAIN {}", sql))
            .map_err(|e| DbError::Query(e.to_string()))?;

        // (explain_key, explain_value) pairs; the value holds the rendered tree
        let lines = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| DbError::Query(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(lines.join("\n"))
    }

    fn export_csv(&self, sql: &str) -> Result<Vec<u8>, DbError> {
        let (_, batches) = self.query_batches(sql)?;

        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(Vec::new());
        for batch in &batches {
            writer
                .write(batch)
                .map_err(|e| DbError::Serialization(e.to_string()))?;
        }
        Ok(writer.into_inner())
    }
}
