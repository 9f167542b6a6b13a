//! Generate → validate → estimate → execute → repair.
//!
//! The pipeline keeps no per-question state. Callers hold the question, the
//! (possibly edited) SQL and the last error, and pass them back in.

use crate::config::QueryConfig;
use crate::db::schema_manager::SchemaManager;
use crate::db::{QueryBackend, QueryResult};
use crate::error::PipelineError;
use crate::guard::{cost, safety, CostReport, SafetyVerdict};
use crate::llm::generator::{yesterday, QueryGenerator};
use crate::llm::models::{GenerationRequest, GenerationResult, RepairRequest};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A generated (or repaired) query with its static checks attached
#[derive(Debug, Clone, Serialize)]
pub struct Draft {
    pub sql: String,
    pub explanation: String,
    pub safety: SafetyVerdict,
    pub cost: CostReport,
}

/// Verdict and cost for SQL the caller supplies (e.g. after editing)
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub safety: SafetyVerdict,
    pub cost: CostReport,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub row_limit: u32,
    pub limit_warning_threshold: u64,
    pub explain: bool,
}

impl From<&QueryConfig> for PipelineSettings {
    fn from(config: &QueryConfig) -> Self {
        Self {
            row_limit: config.row_limit,
            limit_warning_threshold: config.limit_warning_threshold,
            explain: config.explain,
        }
    }
}

pub struct QueryPipeline {
    generator: QueryGenerator,
    schema: SchemaManager,
    backend: Arc<dyn QueryBackend>,
    settings: PipelineSettings,
}

impl QueryPipeline {
    pub fn new(
        generator: QueryGenerator,
        schema: SchemaManager,
        backend: Arc<dyn QueryBackend>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            generator,
            schema,
            backend,
            settings,
        }
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn backend_name(&self) -> &str {
        self.generator.backend_name()
    }

    pub async fn schema_description(&self) -> Result<String, PipelineError> {
        let description = self
            .schema
            .description()
            .await
            .map_err(|e| PipelineError::SchemaUnavailable(e.to_string()))?;

        if description.is_empty() {
            return Err(PipelineError::SchemaUnavailable(format!(
                "table {} has no columns",
                self.table()
            )));
        }
        Ok(description)
    }

    /// Forces the next description to hit the database
    pub async fn refresh_schema(&self) -> Result<usize, PipelineError> {
        self.schema
            .refresh_cache()
            .await
            .map(|columns| columns.len())
            .map_err(|e| PipelineError::SchemaUnavailable(e.to_string()))
    }

    /// Safety verdict plus the text-only cost signal. No engine calls.
    pub fn check_static(&self, sql: &str) -> Check {
        Check {
            safety: safety::validate(sql),
            cost: cost::report(sql, self.settings.limit_warning_threshold),
        }
    }

    /// Static checks, enriched with a planner estimate when enabled.
    ///
    /// The planner is only consulted for SQL that passed the safety gate,
    /// and its failures end up in `cost.plan_note`.
    pub async fn check(&self, sql: &str) -> Check {
        let mut check = self.check_static(sql);
        if !self.settings.explain || !check.safety.is_safe {
            return check;
        }

        let backend = Arc::clone(&self.backend);
        let sql_owned = sql.to_string();
        let plan = match tokio::task::spawn_blocking(move || backend.explain(&sql_owned)).await {
            Ok(plan) => plan.map_err(|e| e.to_string()),
            Err(join_err) => Err(join_err.to_string()),
        };

        check.cost = check.cost.with_plan(plan);
        if let Some(note) = &check.cost.plan_note {
            warn!("No planner estimate: {}", note);
        }
        check
    }

    async fn draft(&self, result: GenerationResult) -> Draft {
        let sql = result.sql().to_string();
        let check = self.check(&sql).await;
        if !check.safety.is_safe {
            warn!("Generated SQL rejected: {}", check.safety.reason);
        }
        Draft {
            sql,
            explanation: result.explanation,
            safety: check.safety,
            cost: check.cost,
        }
    }

    pub async fn generate(&self, question: &str) -> Result<Draft, PipelineError> {
        self.generate_for(question, yesterday()).await
    }

    pub async fn generate_for(&self, question: &str, reference_date: NaiveDate) -> Result<Draft, PipelineError> {
        let request = GenerationRequest {
            question: question.to_string(),
            schema_description: self.schema_description().await?,
            row_limit: self.settings.row_limit,
            reference_date,
        };

        let result = self.generator.generate(&request).await?;
        Ok(self.draft(result).await)
    }

    /// Ask for a corrected query after `failed_sql` failed with `error_message`.
    pub async fn repair(
        &self,
        question: &str,
        failed_sql: &str,
        error_message: &str,
    ) -> Result<Draft, PipelineError> {
        let request = RepairRequest {
            original_question: question.to_string(),
            failed_sql: failed_sql.to_string(),
            error_message: error_message.to_string(),
            schema_description: self.schema_description().await?,
            row_limit: self.settings.row_limit,
        };

        let result = self.generator.repair(&request, yesterday()).await?;
        Ok(self.draft(result).await)
    }

    // Every execution path goes through here first
    fn gate(&self, sql: &str) -> Result<(), PipelineError> {
        let verdict = safety::validate(sql);
        if verdict.is_safe {
            Ok(())
        } else {
            warn!("Blocked unsafe query: {}", verdict.reason);
            Err(PipelineError::UnsafeQuery {
                reason: verdict.reason,
            })
        }
    }

    pub async fn execute(&self, sql: &str) -> Result<QueryResult, PipelineError> {
        self.gate(sql)?;

        let backend = Arc::clone(&self.backend);
        let sql_owned = sql.to_string();
        let result = tokio::task::spawn_blocking(move || backend.execute(&sql_owned))
            .await
            .map_err(|e| PipelineError::ExecutionFailure {
                message: format!("Database task execution failed: {}", e),
            })??;

        info!("Returned {} rows", result.row_count);
        Ok(result)
    }

    pub async fn export_csv(&self, sql: &str) -> Result<Vec<u8>, PipelineError> {
        self.gate(sql)?;

        let backend = Arc::clone(&self.backend);
        let sql_owned = sql.to_string();
        let csv = tokio::task::spawn_blocking(move || backend.export_csv(&sql_owned))
            .await
            .map_err(|e| PipelineError::ExecutionFailure {
                message: format!("Database task execution failed: {}", e),
            })??;
        Ok(csv)
    }
}
