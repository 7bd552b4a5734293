//! Offline feature-hashing embedder.
//!
//! Each lowercased token is hashed into one of `D` buckets with a signed
//! weight, then the vector is L2-normalized. No model, no network, fully
//! deterministic; texts that share vocabulary score high against each other,
//! which is enough for local development and tests.

use std::hash::Hasher;

use async_trait::async_trait;
use twox_hash::XxHash64;

use crate::embeddings::provider::{validate_text, EmbeddingProvider};
use crate::types::AppResult;

pub struct HashingEmbedder {
    dimension: usize,
    id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            id: format!("hashing:xxh64:d{}", dimension),
        }
    }

    fn embed_sync(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0f64; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();

            let index = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) & 1 == 1 { -1.0 } else { 1.0 };
            let magnitude = 0.5 + ((h >> 32) as u32) as f64 / (u32::MAX as f64 * 2.0);
            vector[index] += sign * magnitude;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_one(&self, text: &str) -> AppResult<Vec<f64>> {
        let text = validate_text(text)?;
        Ok(self.embed_sync(text))
    }
}
