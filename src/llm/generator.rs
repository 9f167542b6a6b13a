use crate::llm::models::{GenerationRequest, GenerationResult, RepairRequest};
use crate::llm::prompt::PromptBuilder;
use crate::llm::{LlmError, LlmManager};
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

/// The day before `today`, the default window for generated queries.
pub fn reference_date(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

pub fn yesterday() -> NaiveDate {
    reference_date(Local::now().date_naive())
}

/// Turns questions (and failed attempts) into SQL through one model call each.
pub struct QueryGenerator {
    llm: LlmManager,
    table: String,
}

impl QueryGenerator {
    pub fn new(llm: LlmManager, table: impl Into<String>) -> Self {
        Self {
            llm,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn backend_name(&self) -> &str {
        self.llm.backend_name()
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, LlmError> {
        let prompt = PromptBuilder::new(
            &self.table,
            &request.schema_description,
            request.row_limit,
            request.reference_date,
        )
        .build(None);

        info!("Generating SQL for question: {}", request.question);
        debug!("System prompt: {}", prompt);

        let content = self.llm.complete_json(&prompt, &request.question).await?;
        debug!("Raw model reply: {}", content);

        GenerationResult::parse(&content)
    }

    /// Ask the model to fix `failed_sql` given the engine's error.
    ///
    /// The result is untrusted like any other generation.
    pub async fn repair(
        &self,
        request: &RepairRequest,
        reference_date: NaiveDate,
    ) -> Result<GenerationResult, LlmError> {
        let prompt = PromptBuilder::new(
            &self.table,
            &request.schema_description,
            request.row_limit,
            reference_date,
        )
        .build(Some(request));

        info!("Repairing SQL for question: {}", request.original_question);
        debug!("Repair prompt: {}", prompt);

        let content = self
            .llm
            .complete_json(&prompt, &request.original_question)
            .await?;
        debug!("Raw model reply: {}", content);

        GenerationResult::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelBackend;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct RecordingModel {
        reply: Result<String, String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ModelBackend for RecordingModel {
        async fn complete_json(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), user_message.to_string()));
            self.reply.clone().map_err(LlmError::Connection)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn generator(reply: Result<&str, &str>) -> (QueryGenerator, Arc<RecordingModel>) {
        let model = Arc::new(RecordingModel {
            reply: reply.map(str::to_string).map_err(str::to_string),
            seen: Mutex::new(Vec::new()),
        });
        let generator = QueryGenerator::new(LlmManager::with_backend(model.clone()), "events");
        (generator, model)
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            question: "how many users yesterday?".to_string(),
            schema_description: "- user_id (VARCHAR)".to_string(),
            row_limit: 100,
            reference_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }
    }

    #[test]
    fn reference_date_is_the_previous_day() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(reference_date(today), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[tokio::test]
    async fn question_goes_in_user_message() {
        let (generator, model) =
            generator(Ok(r#"{"sql": "SELECT COUNT(DISTINCT user_id) FROM events", "explanation": "users"}"#));
        let result = generator.generate(&request()).await.unwrap();
        assert_eq!(result.sql, "SELECT COUNT(DISTINCT user_id) FROM events");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "how many users yesterday?");
        assert!(seen[0].0.contains("date = '2024-05-01'"));
    }

    #[tokio::test]
    async fn empty_explanation_is_not_an_error() {
        let (generator, _) = generator(Ok(r#"{"sql": "SELECT 1", "explanation": ""}"#));
        let result = generator.generate(&request()).await.unwrap();
        assert_eq!(result.explanation, "");
    }

    #[tokio::test]
    async fn transport_errors_surface() {
        let (generator, _) = generator(Err("connection refused"));
        assert!(matches!(
            generator.generate(&request()).await,
            Err(LlmError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn prose_reply_is_malformed() {
        let (generator, _) = generator(Ok("Sure! Here is your query: SELECT 1"));
        assert!(matches!(
            generator.generate(&request()).await,
            Err(LlmError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn repair_sends_failure_context() {
        let (generator, model) = generator(Ok(r#"{"sql": "SELECT site FROM events", "explanation": "fixed"}"#));
        let repair = RepairRequest {
            original_question: "sites".to_string(),
            failed_sql: "SELECT sitee FROM events".to_string(),
            error_message: "column sitee not found".to_string(),
            schema_description: "- site (VARCHAR)".to_string(),
            row_limit: 10,
        };
        let result = generator
            .repair(&repair, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(result.explanation, "fixed");

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].0.contains("SELECT sitee FROM events"));
        assert!(seen[0].0.contains("column sitee not found"));
        assert!(seen[0].0.contains("LIMIT 10"));
        assert_eq!(seen[0].1, "sites");
    }
}
