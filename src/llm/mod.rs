pub mod generator;
pub mod models;
pub mod prompt;
pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    Connection(String),
    #[error("LLM response error: {0}")]
    Response(String),
    #[error("LLM configuration error: {0}")]
    Config(String),
    /// The model answered but the payload is not the expected JSON object
    #[error("LLM returned a malformed payload: {0}")]
    Malformed(String),
}

/// A chat model that answers with a JSON object.
///
/// Implementations make exactly one call, at temperature zero, without
/// streaming, and return the raw message content.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete_json(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError>;

    fn name(&self) -> &str;
}

pub struct LlmManager {
    backend: Arc<dyn ModelBackend>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let backend: Arc<dyn ModelBackend> = match config.backend.as_str() {
            "remote" | "openai" => Arc::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Arc::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::Config(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { backend })
    }

    pub fn with_backend(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn complete_json(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        debug!(backend = self.backend.name(), "Calling model backend");
        self.backend.complete_json(system_prompt, user_message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn unknown_backend_is_a_config_error() {
        let mut config = AppConfig::default().llm;
        config.backend = "local".to_string();
        assert!(matches!(LlmManager::new(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn remote_backend_requires_api_key() {
        let config = AppConfig::default().llm;
        assert!(matches!(LlmManager::new(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn ollama_backend_needs_no_key() {
        let mut config = AppConfig::default().llm;
        config.backend = "ollama".to_string();
        config.model = "sqlcoder".to_string();
        let manager = LlmManager::new(&config).unwrap();
        assert_eq!(manager.backend_name(), "ollama");
    }
}
