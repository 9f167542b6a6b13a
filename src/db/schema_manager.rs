use crate::db::{DbError, QueryBackend};
use crate::schema::{self, ColumnInfo, ColumnSpec};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

struct CachedColumns {
    columns: Vec<(String, String)>,
    fetched_at: chrono::DateTime<chrono::Utc>,
}

/// Caches the live column list of the target table and renders it for the model
pub struct SchemaManager {
    backend: Arc<dyn QueryBackend>,
    table: String,
    curated: HashMap<String, ColumnInfo>,
    ttl: Duration,
    cache: RwLock<Option<CachedColumns>>,
}

impl SchemaManager {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        table: impl Into<String>,
        curated: HashMap<String, ColumnInfo>,
        ttl: Duration,
    ) -> Self {
        Self {
            backend,
            table: table.into(),
            curated,
            ttl,
            cache: RwLock::new(None),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn is_fresh(&self, cached: &CachedColumns) -> bool {
        let age = chrono::Utc::now().signed_duration_since(cached.fetched_at);
        age.to_std().map(|age| age < self.ttl).unwrap_or(false)
    }

    /// Re-read the column list from the database
    pub async fn refresh_cache(&self) -> Result<Vec<(String, String)>, DbError> {
        info!("Refreshing column cache for table {}", self.table);

        let backend = Arc::clone(&self.backend);
        let table = self.table.clone();
        let columns = tokio::task::spawn_blocking(move || backend.describe_table(&table))
            .await
            .map_err(|e| DbError::Connection(format!("Schema task failed: {}", e)))??;

        if columns.is_empty() {
            warn!("Table {} reported no columns", self.table);
        }

        let mut cache = self.cache.write().await;
        *cache = Some(CachedColumns {
            columns: columns.clone(),
            fetched_at: chrono::Utc::now(),
        });

        Ok(columns)
    }

    /// Cached column list, refreshed once the TTL has passed
    pub async fn columns(&self) -> Result<Vec<(String, String)>, DbError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| self.is_fresh(c)) {
                debug!("Using cached columns for {}", self.table);
                return Ok(cached.columns.clone());
            }
        }
        self.refresh_cache().await
    }

    pub async fn column_specs(&self) -> Result<Vec<ColumnSpec>, DbError> {
        Ok(schema::merge_columns(&self.columns().await?, &self.curated))
    }

    pub async fn description(&self) -> Result<String, DbError> {
        Ok(schema::render(&self.column_specs().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::QueryResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl QueryBackend for CountingBackend {
        fn describe_table(&self, _table: &str) -> Result<Vec<(String, String)>, DbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                ("SITE".to_string(), "VARCHAR".to_string()),
                ("extra".to_string(), "INTEGER".to_string()),
            ])
        }

        fn execute(&self, _sql: &str) -> Result<QueryResult, DbError> {
            unreachable!()
        }

        fn explain(&self, _sql: &str) -> Result<String, DbError> {
            unreachable!()
        }

        fn export_csv(&self, _sql: &str) -> Result<Vec<u8>, DbError> {
            unreachable!()
        }
    }

    fn manager(ttl: Duration) -> (SchemaManager, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let manager = SchemaManager::new(backend.clone(), "events", schema::curated::columns(), ttl);
        (manager, backend)
    }

    #[tokio::test]
    async fn columns_are_cached_within_ttl() {
        let (manager, backend) = manager(Duration::from_secs(3600));
        manager.columns().await.unwrap();
        manager.columns().await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_ttl_always_refreshes() {
        let (manager, backend) = manager(Duration::ZERO);
        manager.columns().await.unwrap();
        manager.columns().await.unwrap();
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn description_merges_curated_annotations() {
        let (manager, _) = manager(Duration::from_secs(60));
        let description = manager.description().await.unwrap();
        assert_eq!(
            description,
            "- SITE (VARCHAR): The site where the visit happened. Possible values: n12, 12plus, v1, mako\n- extra (INTEGER)"
        );
    }
}
