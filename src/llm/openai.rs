// OpenAI chat completions adapter
// API Reference: https://platform.openai.com/docs/api-reference/chat

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::provider::{CompletionSettings, TextCompletion};
use crate::types::{AppError, AppResult, CompletionRequest, CompletionResponse, TokenUsage};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAIAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    settings: CompletionSettings,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(api_key: &str, settings: CompletionSettings) -> AppResult<Self> {
        Self::with_base_url(api_key, OPENAI_API_BASE, settings)
    }

    pub fn with_base_url(api_key: &str, base_url: &str, settings: CompletionSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::provider_with("failed to build OpenAI HTTP client", e))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        })
    }
}

#[async_trait]
impl TextCompletion for OpenAIAdapter {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
            max_tokens: request.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: request.temperature.unwrap_or(self.settings.temperature),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::provider_with(format!("OpenAI request failed: {}", e), e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                return Err(AppError::provider(format!(
                    "OpenAI API error ({}): {} ({})",
                    status,
                    error_response.error.message,
                    error_response.error.error_type.unwrap_or_default()
                )));
            }

            return Err(AppError::provider(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider_with("Failed to parse OpenAI response", e))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::provider("No response from OpenAI"))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> CompletionSettings {
        CompletionSettings {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_completion_reads_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"Shipped 3 releases."},"finish_reason":"stop"}],
                   "usage":{"prompt_tokens":12,"completion_tokens":4,"total_tokens":16}}"#,
            )
            .create_async()
            .await;

        let adapter = OpenAIAdapter::with_base_url("sk-test", &server.url(), settings()).unwrap();
        let response = adapter
            .complete(&CompletionRequest::new("system", "Did releases"))
            .await
            .unwrap();

        assert_eq!(response.content, "Shipped 3 releases.");
        assert_eq!(response.usage.total_tokens, 16);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_provider_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let adapter = OpenAIAdapter::with_base_url("sk-test", &server.url(), settings()).unwrap();
        let err = adapter
            .complete(&CompletionRequest::new("system", "hello"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider_failure");
    }
}
