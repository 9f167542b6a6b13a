//! System prompt assembly.
//!
//! The prompt only *asks* for the rules below; nothing here enforces them.
//! Enforcement happens in [`crate::guard`] after the model answers.

use crate::llm::models::RepairRequest;
use chrono::NaiveDate;

/// Domain knowledge about the events table, injected as-is.
pub const BUSINESS_RULES: &str = r#"Business rules:
- Ads: every ad event has event_name = 'ads'. The ad format is split over two columns: type ('video' or 'display') and sub_type. When filtering on sub_type always filter on the matching type as well. Video sub types are preroll, midroll and video_paused_ad; every other sub_type (cube, article, monster, jambo, native, parallax, standard, full_screen, prime, banner, ozen, poster, inboard, coast2coast) is a display ad.
- Visits: count visits with COUNT(DISTINCT calculated_visit_id). Do not count visits with visit_first_event.
- Sessions: calculated_visit_id is the session identifier for any per-session analysis.
- Users: count users with COUNT(DISTINCT user_id).
- Video completion rate: among rows with event_name = 'play', the number of distinct play_id with action = 'complete' divided by the number of distinct play_id with action = 'start'. Cast the numerator to DOUBLE.
- Sites: SITE is one of 'n12', '12plus', 'v1', 'mako'. "mako" or "n12" in the question refers to the SITE column."#;

pub struct PromptBuilder<'a> {
    table: &'a str,
    schema_description: &'a str,
    row_limit: u32,
    reference_date: NaiveDate,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(table: &'a str, schema_description: &'a str, row_limit: u32, reference_date: NaiveDate) -> Self {
        Self {
            table,
            schema_description,
            row_limit,
            reference_date,
        }
    }

    fn base_prompt(&self) -> String {
        let date = self.reference_date.format("%Y-%m-%d");
        format!(
            r#"You are a DuckDB SQL expert. Generate SQL queries based on natural language questions.

Table: {table}

Schema:
{schema}

Rules:
1. Always use the exact table name: {table}
2. Always filter by date. By default use date = '{date}' (yesterday) unless the user specifies a different date or date range
3. Always end the query with LIMIT {limit} unless the user specifies a different limit
4. Only write read-only SELECT statements. Never use INSERT, UPDATE, DELETE, DROP, CREATE, ALTER, TRUNCATE, EXEC, EXECUTE, GRANT or REVOKE
5. Use valid DuckDB SQL syntax
6. Column names are case-insensitive but preserve the case as shown in the schema

{rules}

Respond with a single JSON object with exactly two string fields:
{{"sql": "<the SQL query>", "explanation": "<one or two sentences describing what the query returns>"}}
Write the query on one line or encode line breaks as \n inside the JSON string. Do not wrap the JSON in markdown."#,
            table = self.table,
            schema = self.schema_description,
            date = date,
            limit = self.row_limit,
            rules = BUSINESS_RULES,
        )
    }

    /// Prompt for a fresh question
    pub fn generate(&self) -> String {
        self.base_prompt()
    }

    /// Prompt that carries a failed attempt back to the model
    pub fn repair(&self, request: &RepairRequest) -> String {
        format!(
            r#"{base}

A previous query for this question failed when it was executed.

Original question:
{question}

Previous SQL:
{sql}

Database error:
{error}

Fix the query so it runs without this error. Keep the intent of the original question and follow all the rules above. Explain in the explanation field what you changed."#,
            base = self.base_prompt(),
            question = request.original_question,
            sql = request.failed_sql,
            error = request.error_message,
        )
    }

    /// Repair prompt when a failed attempt is given, generation prompt otherwise
    pub fn build(&self, repair: Option<&RepairRequest>) -> String {
        match repair {
            Some(request) => self.repair(request),
            None => self.generate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn generate_prompt_carries_table_limit_and_date() {
        let prompt = PromptBuilder::new("events", "- date (DATE): Event date", 100, date()).generate();
        assert!(prompt.contains("Table: events"));
        assert!(prompt.contains("exact table name: events"));
        assert!(prompt.contains("date = '2024-03-09'"));
        assert!(prompt.contains("LIMIT 100"));
        assert!(prompt.contains("- date (DATE): Event date"));
        assert!(prompt.contains(r#"{"sql": "#));
        assert!(prompt.contains(BUSINESS_RULES));
    }

    #[test]
    fn prompt_is_deterministic() {
        let a = PromptBuilder::new("events", "schema", 50, date()).generate();
        let b = PromptBuilder::new("events", "schema", 50, date()).generate();
        assert_eq!(a, b);
    }

    #[test]
    fn repair_prompt_embeds_failure() {
        let request = RepairRequest {
            original_question: "visits per site".to_string(),
            failed_sql: "SELECT sitee FROM events".to_string(),
            error_message: "Binder Error: Referenced column \"sitee\" not found".to_string(),
            schema_description: "schema".to_string(),
            row_limit: 100,
        };
        let builder = PromptBuilder::new("events", "schema", 100, date());
        let prompt = builder.build(Some(&request));
        assert!(prompt.starts_with(&builder.generate()));
        assert!(prompt.contains("visits per site"));
        assert!(prompt.contains("SELECT sitee FROM events"));
        assert!(prompt.contains("Referenced column \"sitee\" not found"));
    }

    #[test]
    fn no_failed_attempt_means_generation_prompt() {
        let builder = PromptBuilder::new("events", "schema", 100, date());
        assert_eq!(builder.build(None), builder.generate());
        assert!(!builder.build(None).contains("Previous SQL:"));
    }

    #[test]
    fn single_visit_convention() {
        assert!(BUSINESS_RULES.contains("COUNT(DISTINCT calculated_visit_id)"));
        assert!(!BUSINESS_RULES.contains("SUM(visit_first_event)"));
    }
}
