use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// API Routes - the UI drives the whole question lifecycle through these
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Generation and repair
            .route("/nl-query", post(handlers::api::nl_query))
            .route("/repair", post(handlers::api::repair_query))

            // Checks on caller-edited SQL
            .route("/validate", post(handlers::api::validate_query))

            // Execution
            .route("/query", post(handlers::api::execute_query))
            .route("/export/csv", post(handlers::api::export_csv))

            // Schema
            .route("/schema", get(handlers::api::get_schema))
            .route("/schema/refresh", post(handlers::api::refresh_schema))

            // System status
            .route("/status", get(handlers::api::system_status)),
    )
}
