use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::db::QueryResult;
use crate::error::PipelineError;
use crate::pipeline::{Check, Draft};
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize, Clone)]
pub struct NlQueryRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct RepairQueryRequest {
    pub question: String,
    pub sql: String,
    pub error: String,
}

// Response types

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SchemaInfo {
    pub table: String,
    pub column_count: usize,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub table: String,
    pub backend: String,
    pub row_limit: u32,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::SchemaUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::ModelInvocation(_) | PipelineError::MalformedResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            PipelineError::UnsafeQuery { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::ExecutionFailure { .. } => StatusCode::BAD_REQUEST,
        };

        error!("{}", self);

        let message = match &self {
            PipelineError::UnsafeQuery { reason } => reason.clone(),
            PipelineError::ExecutionFailure { message } => message.clone(),
            other => other.to_string(),
        };

        let body = ErrorBody {
            kind: self.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), Response> {
    if value.trim().is_empty() {
        let body = ErrorBody {
            kind: "invalid_request",
            message: format!("Please enter a {}.", field),
        };
        return Err((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }
    Ok(())
}

// Natural language query -> draft SQL with checks attached
pub async fn nl_query(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<NlQueryRequest>,
) -> Result<Json<Draft>, Response> {
    require_non_empty("question", &payload.question)?;
    debug!("NL-query: {}", payload.question);

    let draft = app_state
        .pipeline
        .generate(&payload.question)
        .await
        .map_err(IntoResponse::into_response)?;

    info!("Generated SQL (safe: {}): {}", draft.safety.is_safe, draft.sql);
    Ok(Json(draft))
}

// Repair after an execution failure; the result is validated like any draft
pub async fn repair_query(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RepairQueryRequest>,
) -> Result<Json<Draft>, Response> {
    require_non_empty("question", &payload.question)?;
    require_non_empty("SQL query", &payload.sql)?;

    let draft = app_state
        .pipeline
        .repair(&payload.question, &payload.sql, &payload.error)
        .await
        .map_err(IntoResponse::into_response)?;

    info!("Repaired SQL (safe: {}): {}", draft.safety.is_safe, draft.sql);
    Ok(Json(draft))
}

// Re-check SQL the user edited by hand
pub async fn validate_query(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SqlRequest>,
) -> Result<Json<Check>, Response> {
    require_non_empty("SQL query", &payload.sql)?;
    Ok(Json(app_state.pipeline.check(&payload.sql).await))
}

// Query execution
pub async fn execute_query(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SqlRequest>,
) -> Result<Json<QueryResult>, Response> {
    require_non_empty("SQL query", &payload.sql)?;

    let result = app_state
        .pipeline
        .execute(&payload.sql)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(result))
}

// Data export
pub async fn export_csv(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SqlRequest>,
) -> Result<Response, Response> {
    require_non_empty("SQL query", &payload.sql)?;

    let csv = app_state
        .pipeline
        .export_csv(&payload.sql)
        .await
        .map_err(IntoResponse::into_response)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"query_results.csv\""),
    );

    Ok((StatusCode::OK, headers, csv).into_response())
}

// Schema
pub async fn get_schema(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SchemaInfo>, PipelineError> {
    let description = app_state.pipeline.schema_description().await?;

    Ok(Json(SchemaInfo {
        table: app_state.pipeline.table().to_string(),
        column_count: description.lines().filter(|l| l.starts_with("- ")).count(),
        description,
    }))
}

pub async fn refresh_schema(
    State(app_state): State<Arc<AppState>>,
) -> Result<StatusCode, PipelineError> {
    let count = app_state.pipeline.refresh_schema().await?;
    info!("Schema refreshed: {} columns", count);
    Ok(StatusCode::NO_CONTENT)
}

// System status
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let now = chrono::Utc::now();
    let uptime = now.signed_duration_since(state.startup_time).num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        table: state.pipeline.table().to_string(),
        backend: state.config.llm.backend.clone(),
        row_limit: state.pipeline.settings().row_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::db::backend::DuckDbBackend;
    use crate::db::db_pool::DuckDBConnectionManager;
    use crate::db::schema_manager::SchemaManager;
    use crate::llm::generator::QueryGenerator;
    use crate::llm::{LlmError, LlmManager, ModelBackend};
    use crate::pipeline::{PipelineSettings, QueryPipeline};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct SilentModel;

    #[async_trait]
    impl ModelBackend for SilentModel {
        async fn complete_json(&self, _system_prompt: &str, _user_message: &str) -> Result<String, LlmError> {
            Err(LlmError::Connection("not reachable in tests".to_string()))
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    fn state() -> Arc<AppState> {
        let config = AppConfig::default();
        let manager = DuckDBConnectionManager::new(":memory:".to_string(), false).unwrap();
        let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
        let backend: Arc<dyn crate::db::QueryBackend> = Arc::new(DuckDbBackend::new(pool));

        let pipeline = QueryPipeline::new(
            QueryGenerator::new(LlmManager::with_backend(Arc::new(SilentModel)), "events"),
            SchemaManager::new(Arc::clone(&backend), "events", HashMap::new(), Duration::from_secs(60)),
            backend,
            PipelineSettings {
                row_limit: 100,
                limit_warning_threshold: 500,
                explain: false,
            },
        );
        Arc::new(AppState::new(config, pipeline))
    }

    #[tokio::test]
    async fn validate_rejects_blank_sql() {
        let response = validate_query(
            State(state()),
            Json(SqlRequest {
                sql: "  \n ".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn validate_returns_verdict_for_edited_sql() {
        let Json(check) = validate_query(
            State(state()),
            Json(SqlRequest {
                sql: "DROP TABLE events".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(!check.safety.is_safe);
        assert_eq!(check.safety.reason, "contains forbidden keyword: DROP");
    }

    #[test]
    fn pipeline_errors_map_to_statuses() {
        let cases = [
            (PipelineError::SchemaUnavailable("gone".into()), StatusCode::SERVICE_UNAVAILABLE),
            (PipelineError::ModelInvocation("timeout".into()), StatusCode::BAD_GATEWAY),
            (PipelineError::MalformedResponse("prose".into()), StatusCode::BAD_GATEWAY),
            (
                PipelineError::UnsafeQuery {
                    reason: "contains forbidden keyword: DROP".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PipelineError::ExecutionFailure {
                    message: "Catalog Error".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn blank_input_is_a_bad_request() {
        let response = require_non_empty("question", "   \n").unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(require_non_empty("question", "visits yesterday").is_ok());
    }

    #[tokio::test]
    async fn error_body_carries_kind_and_engine_message() {
        let response = PipelineError::ExecutionFailure {
            message: "Binder Error: column x not found".into(),
        }
        .into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["kind"], "execution_failure");
        assert_eq!(body["message"], "Binder Error: column x not found");
    }
}
