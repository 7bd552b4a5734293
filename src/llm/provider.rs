use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::types::{AppResult, CompletionRequest, CompletionResponse, LLMProvider};

/// Opaque text-completion service: system instructions + user text in,
/// completion text out. Provider errors are surfaced verbatim as
/// `ProviderFailure`.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse>;
}

/// Model parameters shared by every adapter.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl CompletionSettings {
    pub fn from_config(config: &LLMConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Build the configured completion client, or `None` when its API key is missing.
pub fn create_completion(config: &LLMConfig) -> AppResult<Option<Arc<dyn TextCompletion>>> {
    let settings = CompletionSettings::from_config(config);

    let adapter: Arc<dyn TextCompletion> = match config.provider {
        LLMProvider::Anthropic if !config.anthropic_api_key.is_empty() => Arc::new(
            crate::llm::anthropic::AnthropicAdapter::new(&config.anthropic_api_key, settings)?,
        ),
        LLMProvider::OpenAI if !config.openai_api_key.is_empty() => Arc::new(
            crate::llm::openai::OpenAIAdapter::new(&config.openai_api_key, settings)?,
        ),
        provider => {
            warn!(%provider, "No API key for text completion; generation endpoints disabled");
            return Ok(None);
        }
    };

    info!(provider = adapter.provider_name(), model = %config.model, "Text completion ready");
    Ok(Some(adapter))
}
