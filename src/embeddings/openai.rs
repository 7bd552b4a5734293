// OpenAI-compatible embeddings adapter
// Talks to any server exposing POST {base_url}/embeddings with the OpenAI
// request/response shape (OpenAI itself, text-embeddings-inference, vLLM, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::embeddings::provider::{check_dimension, validate_text, EmbeddingProvider};
use crate::types::{AppError, AppResult};

pub struct OpenAIEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    concurrency: usize,
    id: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    index: usize,
    embedding: Vec<f64>,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    message: String,
}

impl OpenAIEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
        concurrency: usize,
    ) -> AppResult<Self> {
        if model.trim().is_empty() {
            return Err(AppError::InvalidInput("missing embedding model name".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::provider_with("failed to build embedding HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            dimension,
            concurrency: concurrency.max(1),
            id: format!("openai:{}:d{}", model, dimension),
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        Self::new(
            &config.api_key,
            &config.base_url,
            &config.model,
            config.dimensions,
            Duration::from_secs(config.timeout_secs),
            config.concurrency,
        )
    }

    /// Only the v3 models accept a requested output size.
    fn requested_dimensions(&self) -> Option<usize> {
        if self.model.starts_with("text-embedding-3") {
            Some(self.dimension)
        } else {
            None
        }
    }

    async fn request(&self, inputs: &[&str]) -> AppResult<Vec<Vec<f64>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.requested_dimensions(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                return Err(AppError::provider(format!(
                    "embedding API error ({}): {}",
                    status, parsed.error.message
                )));
            }
            return Err(AppError::provider(format!(
                "embedding API error ({}): {}",
                status, error_text
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::provider_with("failed to parse embedding response", e))?;

        if parsed.data.len() != inputs.len() {
            return Err(AppError::provider(format!(
                "embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        parsed.data.sort_by_key(|entry| entry.index);

        debug!(inputs = inputs.len(), model = %self.model, "Embedding batch completed");

        parsed
            .data
            .into_iter()
            .map(|entry| check_dimension(&self.id, self.dimension, entry.embedding))
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_concurrency(&self) -> usize {
        self.concurrency
    }

    async fn embed_one(&self, text: &str) -> AppResult<Vec<f64>> {
        let text = validate_text(text)?;
        let mut vectors = self.request(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::provider("embedding API returned no vectors"))
    }

    /// One HTTP round trip for the whole batch.
    async fn embed_many(&self, texts: &[String]) -> AppResult<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs = texts
            .iter()
            .map(|t| validate_text(t))
            .collect::<AppResult<Vec<&str>>>()?;
        self.request(&inputs).await
    }
}
