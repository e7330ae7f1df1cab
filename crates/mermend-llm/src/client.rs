use std::time::Duration;

use tracing::{debug, info};

use crate::error::classify_failure;
use crate::types::*;
use crate::{ApiError, GenerateBackend};

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            // OpenAI-compatible endpoint of the hosted model
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(8192),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LlmConfig {
        &mut self.config
    }

    pub async fn chat(&self, messages: Vec<Message>) -> Result<ChatResponse, ApiError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("LLM request to {}: {} messages", url, request.messages.len());

        let mut req_builder = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .json(&request);

        if let Some(api_key) = &self.config.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| self.transport_error("Failed to send request to LLM", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &error_text));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error("Failed to parse LLM response", e))?;

        info!(
            "LLM response: finish_reason={:?}, total_tokens={:?}",
            chat_response
                .choices
                .first()
                .and_then(|c| c.finish_reason.as_ref()),
            chat_response.usage.as_ref().map(|u| u.total_tokens)
        );

        Ok(chat_response)
    }

    fn transport_error(&self, context: &str, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.config.timeout)
        } else {
            ApiError::Other(format!("{context}: {e}"))
        }
    }
}

impl GenerateBackend for LlmClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
    ) -> Result<String, ApiError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_instruction {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        let response = self.chat(messages).await?;
        response
            .choices
            .first()
            .and_then(|c| c.message.text_content())
            .map(String::from)
            .ok_or_else(|| ApiError::Other("LLM returned no text content".to_string()))
    }
}
