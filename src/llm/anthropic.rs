// Anthropic Messages API adapter
// API Reference: https://docs.anthropic.com/en/api/messages

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::provider::{CompletionSettings, TextCompletion};
use crate::types::{AppError, AppResult, CompletionRequest, CompletionResponse, TokenUsage};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    settings: CompletionSettings,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicErrorResponse {
    error: AnthropicError,
}

#[derive(Deserialize)]
struct AnthropicError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: &str, settings: CompletionSettings) -> AppResult<Self> {
        Self::with_base_url(api_key, ANTHROPIC_API_BASE, settings)
    }

    pub fn with_base_url(api_key: &str, base_url: &str, settings: CompletionSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::provider_with("failed to build Anthropic HTTP client", e))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        })
    }
}

#[async_trait]
impl TextCompletion for AnthropicAdapter {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        let url = format!("{}/messages", self.base_url);

        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: request.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: request.temperature.unwrap_or(self.settings.temperature),
            system: &request.system_instructions,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.user_text,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::provider_with(format!("Anthropic request failed: {}", e), e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<AnthropicErrorResponse>(&error_text) {
                return Err(AppError::provider(format!(
                    "Anthropic API error ({}): {} ({})",
                    status, error_response.error.message, error_response.error.error_type
                )));
            }

            return Err(AppError::provider(format!(
                "Anthropic API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider_with("Failed to parse Anthropic response", e))?;

        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            content,
            finish_reason: parsed.stop_reason.unwrap_or_else(|| "end_turn".to_string()),
            usage: TokenUsage {
                prompt_tokens: parsed.usage.input_tokens,
                completion_tokens: parsed.usage.output_tokens,
                total_tokens: parsed.usage.input_tokens + parsed.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> CompletionSettings {
        CompletionSettings {
            model: "claude-3-haiku-20240307".to_string(),
            temperature: 0.7,
            max_tokens: 256,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_completion_joins_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"content":[{"type":"text","text":"Led a team of 5 "},{"type":"text","text":"engineers."}],
                   "stop_reason":"end_turn","usage":{"input_tokens":40,"output_tokens":9}}"#,
            )
            .create_async()
            .await;

        let adapter = AnthropicAdapter::with_base_url("sk-ant-test", &server.url(), settings()).unwrap();
        let response = adapter
            .complete(&CompletionRequest::new("You are a resume writer.", "Managed people"))
            .await
            .unwrap();

        assert_eq!(response.content, "Led a team of 5 engineers.");
        assert_eq!(response.usage.total_tokens, 49);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let adapter = AnthropicAdapter::with_base_url("bad", &server.url(), settings()).unwrap();
        let err = adapter
            .complete(&CompletionRequest::new("system", "hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "provider_failure");
        assert!(err.to_string().contains("invalid x-api-key"));
    }
}
