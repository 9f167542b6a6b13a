use crate::db::DbError;
use crate::llm::LlmError;
use thiserror::Error;

/// Failure taxonomy of the generate / validate / execute / repair pipeline.
///
/// Every stage returns either a clean value or one of these; nothing is
/// retried implicitly.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Unsafe query: {reason}")]
    UnsafeQuery { reason: String },

    #[error("Query execution failed: {message}")]
    ExecutionFailure { message: String },
}

impl PipelineError {
    /// Stable identifier the UI can switch on
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SchemaUnavailable(_) => "schema_unavailable",
            PipelineError::ModelInvocation(_) => "model_invocation",
            PipelineError::MalformedResponse(_) => "malformed_response",
            PipelineError::UnsafeQuery { .. } => "unsafe_query",
            PipelineError::ExecutionFailure { .. } => "execution_failure",
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Malformed(msg) => PipelineError::MalformedResponse(msg),
            other => PipelineError::ModelInvocation(other.to_string()),
        }
    }
}

impl From<DbError> for PipelineError {
    fn from(err: DbError) -> Self {
        match err {
            // The engine message is what the repair prompt needs, keep it verbatim
            DbError::Query(message) => PipelineError::ExecutionFailure { message },
            other => PipelineError::ExecutionFailure {
                message: other.to_string(),
            },
        }
    }
}
