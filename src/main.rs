use clap::Parser;
use r2d2::Pool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use nl_query::config::{AppConfig, CliArgs};
use nl_query::db::backend::DuckDbBackend;
use nl_query::db::db_pool::DuckDBConnectionManager;
use nl_query::db::schema_manager::SchemaManager;
use nl_query::db::QueryBackend;
use nl_query::llm::generator::QueryGenerator;
use nl_query::llm::LlmManager;
use nl_query::pipeline::{PipelineSettings, QueryPipeline};
use nl_query::schema::curated;
use nl_query::util::logging::init_tracing;
use nl_query::web;
use nl_query::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(args.log_json);

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Initializing DuckDB connection pool for {} (read-only: {})",
        config.database.connection_string, config.database.read_only
    );
    let db_manager = DuckDBConnectionManager::new(
        config.database.connection_string.clone(),
        config.database.read_only,
    )?;
    let pool = Pool::builder()
        .max_size(config.database.pool_size as u32)
        .build(db_manager)?;
    let backend: Arc<dyn QueryBackend> = Arc::new(DuckDbBackend::new(pool));

    // Initialize LLM manager
    info!("Initializing LLM manager with backend: {}", config.llm.backend);
    let llm_manager = LlmManager::new(&config.llm)?;
    let generator = QueryGenerator::new(llm_manager, config.query.table.clone());

    let schema_manager = SchemaManager::new(
        Arc::clone(&backend),
        config.query.table.clone(),
        curated::columns(),
        Duration::from_secs(config.query.schema_ttl_secs),
    );

    let pipeline = QueryPipeline::new(
        generator,
        schema_manager,
        backend,
        PipelineSettings::from(&config.query),
    );

    // Initialize schema cache
    info!("Initializing schema cache for {}", config.query.table);
    match pipeline.refresh_schema().await {
        Ok(count) => info!("Schema cache holds {} columns", count),
        // Continue anyway, it will be refreshed on first use
        Err(e) => error!("Failed to initialize schema cache: {}", e),
    }

    let app_state = Arc::new(AppState::new(config.clone(), pipeline));

    // Start the web server
    info!("Starting nl-query server on {}:{}", config.web.host, config.web.port);
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
