use crate::config::LlmConfig;
use crate::llm::{LlmError, ModelBackend};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat completions endpoint in JSON mode.
pub struct RemoteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
}

#[derive(Serialize, Debug)]
struct PromptRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: usize,
    response_format: ResponseFormat,
}

#[derive(Serialize, Debug)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize, Debug)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct PromptResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl RemoteLlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::Config("API key is required for remote LLM provider".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, system_prompt: &str, user_message: &str) -> PromptRequest {
        PromptRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user",
                    content: user_message.to_string(),
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        }
    }
}

fn extract_content(body: &str) -> Result<String, LlmError> {
    let prompt_response: PromptResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::Malformed(format!("{} - Response was: {}", e, body)))?;

    let choice = prompt_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Malformed("No choices in response".to_string()))?;

    choice
        .message
        .content
        .ok_or_else(|| LlmError::Malformed("Response message has no content".to_string()))
}

#[async_trait]
impl ModelBackend for RemoteLlmProvider {
    async fn complete_json(&self, system_prompt: &str, user_message: &str) -> Result<String, LlmError> {
        let request = self.build_request(system_prompt, user_message);

        info!("Sending request to {} with model: {}", self.api_url, self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("API responded with status code: {}{}", status, error_body);
            return Err(LlmError::Response(format!(
                "API responded with status code: {}{}",
                status, error_body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Connection(format!("Failed to read response body: {}", e)))?;
        debug!("Raw response from API: {}", body);

        extract_content(&body)
    }

    fn name(&self) -> &str {
        "remote"
    }
}
