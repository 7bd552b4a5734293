use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use tracing::info;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::embeddings::hashing::HashingEmbedder;
use crate::embeddings::openai::OpenAIEmbedder;
use crate::types::{AppError, AppResult};

/// Text → fixed-length vector.
///
/// Every vector a provider returns has length [`EmbeddingProvider::dimension`].
/// Empty (whitespace-only) input is rejected with `InvalidInput` before any
/// backend call; backend trouble surfaces as `ProviderFailure` and is never
/// retried here.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the backend and model, e.g. `openai:text-embedding-3-small:d384`.
    fn provider_id(&self) -> &str;

    /// Output dimensionality D.
    fn dimension(&self) -> usize;

    /// Upper bound on in-flight requests when `embed_many` fans out.
    fn max_concurrency(&self) -> usize {
        4
    }

    async fn embed_one(&self, text: &str) -> AppResult<Vec<f64>>;

    /// Same as calling `embed_one` per element; output order matches input order.
    async fn embed_many(&self, texts: &[String]) -> AppResult<Vec<Vec<f64>>> {
        for text in texts {
            validate_text(text)?;
        }
        let calls: Vec<_> = texts.iter().map(|text| self.embed_one(text)).collect();
        futures::stream::iter(calls)
            .buffered(self.max_concurrency().max(1))
            .try_collect()
            .await
    }
}

/// Reject text that is empty after trimming.
pub fn validate_text(text: &str) -> AppResult<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "text to embed must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// A backend that hands back the wrong length breaks the store invariant.
pub fn check_dimension(provider_id: &str, expected: usize, vector: Vec<f64>) -> AppResult<Vec<f64>> {
    if vector.len() != expected {
        return Err(AppError::provider(format!(
            "{} returned a {}-dimensional vector, expected {}",
            provider_id,
            vector.len(),
            expected
        )));
    }
    Ok(vector)
}

/// Build the provider named in configuration. Called once at startup.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::InvalidInput(
            "EMBEDDING_DIMENSIONS must be positive".to_string(),
        ));
    }

    let provider: Arc<dyn EmbeddingProvider> = match config.backend {
        EmbeddingBackend::OpenAI => Arc::new(OpenAIEmbedder::from_config(config)?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.dimensions)),
    };

    info!(
        provider = provider.provider_id(),
        dimension = provider.dimension(),
        "Embedding provider ready"
    );
    Ok(provider)
}
