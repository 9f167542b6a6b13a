use crate::config::LlmConfig;
use crate::llm::{LlmError, ModelBackend};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct OllamaRequest {
    model: String,
    system: String,
    prompt: String,
    format: &'static str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
    // Use serde to ignore unknown fields
    #[serde(flatten)]
    extra: std::collections::HashMap<String, serde_json::Value>,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434/api/generate".to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            model: config.model.clone(),
        })
    }

    fn build_request(&self, system_prompt: &str, user_message: &str) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            system: system_prompt.to_string(),
            prompt: user_message.to_string(),
            format: "json",
            stream: false, // Explicitly disable streaming
            options: OllamaOptions { temperature: 0.0 },
        }
    }
}

fn extract_response(body: &str) -> Result<String, LlmError> {
    match serde_json::from_str::<OllamaResponse>(body) {
        Ok(resp) => {
            if resp.done == Some(false) {
                debug!("Ollama reported an unfinished response from {:?}", resp.model);
            }
            debug!("Ignored Ollama fields: {:?}", resp.extra.keys().collect::<Vec<_>>());
            Ok(resp.response)
        }
        Err(e) => {
            error!("Failed to parse Ollama response: {} - Response was: {}", e, body);
            Err(LlmError::Malformed(format!(
                "Failed to parse Ollama response: {} - Response was: {}",
                e, body
            )))
        }
    }
}

#[async_trait]
impl ModelBackend for OllamaProvider {
    async fn complete_json(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let request = self.build_request(system_prompt, user_message);

        info!("Sending request to Ollama with model: {}", self.model);
        debug!("API URL: {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Try to get the error message from the response body
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::Response(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::Connection(format!("Failed to read response body: {}", e)))?;

        debug!("Raw response from Ollama: {}", response_text);

        extract_response(&response_text)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
