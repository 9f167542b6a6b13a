use crate::llm::LlmError;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// Input data for SQL generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub question: String,
    pub schema_description: String,
    pub row_limit: u32,
    /// Fallback day for the mandatory date filter
    pub reference_date: NaiveDate,
}

/// What the model produced. Both fields always exist; a missing or null
/// key in the reply becomes an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sql: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub explanation: String,
}

// Prior failure handed back to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRequest {
    pub original_question: String,
    pub failed_sql: String,
    pub error_message: String,
    pub schema_description: String,
    pub row_limit: u32,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Models occasionally wrap the object in a ```json fence despite json mode
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

impl GenerationResult {
    /// Parse the model's message content.
    ///
    /// Only a payload that is not a JSON object at all is an error.
    pub fn parse(content: &str) -> Result<Self, LlmError> {
        let payload = strip_code_fence(content);
        let value: serde_json::Value = serde_json::from_str(payload).map_err(|e| {
            LlmError::Malformed(format!("{} - Response was: {}", e, content))
        })?;

        if !value.is_object() {
            return Err(LlmError::Malformed(format!(
                "expected a JSON object - Response was: {}",
                content
            )));
        }

        serde_json::from_value(value).map_err(|e| LlmError::Malformed(e.to_string()))
    }

    pub fn sql(&self) -> &str {
        self.sql.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_object_parses() {
        let result = GenerationResult::parse(
            r#"{"sql": "SELECT 1\nLIMIT 100", "explanation": "counts things"}"#,
        )
        .unwrap();
        assert_eq!(result.sql, "SELECT 1\nLIMIT 100");
        assert_eq!(result.explanation, "counts things");
    }

    #[test]
    fn missing_or_null_fields_default_to_empty() {
        let result = GenerationResult::parse(r#"{"sql": "SELECT 1"}"#).unwrap();
        assert_eq!(result.explanation, "");

        let result = GenerationResult::parse(r#"{"sql": null, "explanation": "none"}"#).unwrap();
        assert_eq!(result.sql, "");

        let result = GenerationResult::parse("{}").unwrap();
        assert_eq!(result, GenerationResult::default());
    }

    #[test]
    fn fenced_object_parses() {
        let result =
            GenerationResult::parse("```json\n{\"sql\": \"SELECT 2\", \"explanation\": \"\"}\n```")
                .unwrap();
        assert_eq!(result.sql, "SELECT 2");
    }

    #[test]
    fn non_objects_are_malformed() {
        for content in ["SELECT * FROM t", r#"["SELECT 1", "x"]"#, "\"SELECT 1\"", ""] {
            assert!(
                matches!(GenerationResult::parse(content), Err(LlmError::Malformed(_))),
                "{content}"
            );
        }
    }

    #[test]
    fn wrong_field_types_are_malformed() {
        assert!(matches!(
            GenerationResult::parse(r#"{"sql": 42}"#),
            Err(LlmError::Malformed(_))
        ));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let result =
            GenerationResult::parse(r#"{"sql": "SELECT 1", "explanation": "", "confidence": 0.9}"#)
                .unwrap();
        assert_eq!(result.sql(), "SELECT 1");
    }
}
