//! Ingestion and query orchestration.
//!
//! Ingestion runs `Received -> Extracted -> Embedded -> Persisted`. Nothing
//! touches the store until extraction and embedding have both succeeded, so a
//! failed ingestion leaves no partial record behind. Queries are read only.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ExtractionConfig, SearchConfig};
use crate::db::VectorRecordStore;
use crate::embeddings::{self, DocumentProcessor, EmbeddingProvider, Extraction};
use crate::models::{Category, DocumentRecord, SimilarityQuery, SimilarityResult};
use crate::types::{AppError, AppResult};

/// Ingestion stages. A failure is reported with the stage that was being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Extracted,
    Embedded,
    Persisted,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStage::Received => "received",
            IngestStage::Extracted => "extracted",
            IngestStage::Embedded => "embedded",
            IngestStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Raw content to ingest. Documents go through the extractor; plain text
/// (job postings, course descriptions) is embedded as given.
#[derive(Debug, Clone)]
pub enum IngestContent {
    Document { bytes: Vec<u8>, mime_type: String },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Reusing an existing id replaces that record's text and vector.
    pub id: Option<String>,
    pub category: Category,
    pub source_uri: String,
    pub title: Option<String>,
    pub content: IngestContent,
    pub metadata: serde_json::Value,
}

impl IngestRequest {
    pub fn text(category: Category, text: impl Into<String>) -> Self {
        Self {
            id: None,
            category,
            source_uri: String::new(),
            title: None,
            content: IngestContent::Text(text.into()),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn document(category: Category, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            content: IngestContent::Document {
                bytes,
                mime_type: mime_type.into(),
            },
            ..Self::text(category, String::new())
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source_uri: impl Into<String>) -> Self {
        self.source_uri = source_uri.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IngestReport {
    pub record_id: String,
    pub category: Category,
    pub dimension: usize,
    pub text_chars: usize,
    /// The stored text, i.e. what was embedded.
    #[serde(skip)]
    pub text: String,
    #[serde(skip)]
    pub embedding: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryReport {
    pub results: Vec<SimilarityResult>,
    /// Candidates left out because their vector length differed from the query's.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct MatchingPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorRecordStore>,
    processor: DocumentProcessor,
    extraction: ExtractionConfig,
    search: SearchConfig,
}

impl MatchingPipeline {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorRecordStore>,
        extraction: ExtractionConfig,
        search: SearchConfig,
    ) -> Self {
        Self {
            provider,
            store,
            processor: DocumentProcessor::new(extraction.min_chars),
            extraction,
            search,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<dyn VectorRecordStore> {
        &self.store
    }

    pub fn default_limit(&self) -> i64 {
        self.search.default_limit
    }

    /// Extract, embed and persist one document.
    pub async fn ingest(&self, request: IngestRequest) -> AppResult<IngestReport> {
        let record_id = request
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        debug!(record_id = %record_id, stage = %IngestStage::Received, category = %request.category, "Ingestion started");

        self.run_ingest(record_id.clone(), request)
            .await
            .map_err(|failure| {
                warn!(
                    record_id = %record_id,
                    stage = %failure.stage,
                    kind = failure.error.kind(),
                    error = %failure.error,
                    "Ingestion failed"
                );
                failure.error
            })
    }

    async fn run_ingest(&self, record_id: String, request: IngestRequest) -> Result<IngestReport, IngestFailure> {
        let text = self
            .text_for(&record_id, request.content)
            .await
            .map_err(IngestFailure::at(IngestStage::Extracted))?;
        debug!(record_id = %record_id, stage = %IngestStage::Extracted, chars = text.chars().count(), "Text ready");

        let embedding = self
            .provider
            .embed_one(&text)
            .await
            .map_err(IngestFailure::at(IngestStage::Embedded))?;
        if embedding.len() != self.provider.dimension() {
            return Err(IngestFailure {
                stage: IngestStage::Embedded,
                error: AppError::provider(format!(
                    "{} returned {} values, expected {}",
                    self.provider.provider_id(),
                    embedding.len(),
                    self.provider.dimension()
                )),
            });
        }
        debug!(record_id = %record_id, stage = %IngestStage::Embedded, dimension = embedding.len(), "Embedding ready");

        let metadata = match request.metadata {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        let record = DocumentRecord {
            id: record_id,
            category: request.category,
            source_uri: request.source_uri,
            title: request.title,
            raw_text: text,
            embedding,
            metadata,
            created_at: Utc::now(),
        };

        self.store
            .upsert(&record)
            .await
            .map_err(IngestFailure::at(IngestStage::Persisted))?;

        info!(
            record_id = %record.id,
            category = %record.category,
            stage = %IngestStage::Persisted,
            provider = self.provider.provider_id(),
            "Document ingested"
        );

        Ok(IngestReport {
            record_id: record.id,
            category: record.category,
            dimension: record.embedding.len(),
            text_chars: record.raw_text.chars().count(),
            text: record.raw_text,
            embedding: record.embedding,
        })
    }

    /// Rank stored records of one category against a query vector.
    pub async fn query(&self, query: SimilarityQuery) -> AppResult<QueryReport> {
        let limit = validate_limit(query.limit)?;
        if query.query_vector.is_empty() {
            return Err(AppError::InvalidInput("query vector must not be empty".to_string()));
        }

        let candidates = self.store.list_by_category(query.category).await?;
        debug!(category = %query.category, candidates = candidates.len(), "Fetched candidates");

        let outcome = embeddings::rank(&query.query_vector, &candidates, limit)?;
        if outcome.skipped > 0 {
            warn!(
                category = %query.category,
                skipped = outcome.skipped,
                "Candidates skipped for dimension mismatch"
            );
        }

        let results = outcome
            .results
            .iter()
            .map(|c| c.to_result(self.search.preview_chars))
            .collect();
        Ok(QueryReport {
            results,
            skipped: outcome.skipped,
        })
    }

    /// Embed `text` and rank against it.
    pub async fn query_text(&self, text: &str, category: Category, limit: i64) -> AppResult<QueryReport> {
        validate_limit(limit)?;
        let query_vector = self.provider.embed_one(text).await?;
        self.query(SimilarityQuery {
            query_vector,
            category,
            limit,
        })
        .await
    }

    /// Suggest courses for a stored résumé.
    pub async fn match_resume(&self, resume_id: &str, limit: i64) -> AppResult<QueryReport> {
        let resume = self
            .store
            .get(resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("resume {} not found", resume_id)))?;
        if resume.category != Category::Resume {
            return Err(AppError::InvalidInput(format!(
                "record {} is a {}, not a resume",
                resume_id, resume.category
            )));
        }
        if resume.embedding.is_empty() {
            return Err(AppError::Internal(format!("resume {} has no stored embedding", resume_id)));
        }

        self.query(SimilarityQuery {
            query_vector: resume.embedding,
            category: Category::Course,
            limit,
        })
        .await
    }

    async fn text_for(&self, record_id: &str, content: IngestContent) -> AppResult<String> {
        let (bytes, mime_type) = match content {
            IngestContent::Text(text) => {
                embeddings::validate_text(&text)?;
                return Ok(text);
            }
            IngestContent::Document { bytes, mime_type } => (bytes, mime_type),
        };
        if bytes.is_empty() {
            return Err(AppError::InvalidInput("document is empty".to_string()));
        }

        let processor = self.processor;
        let extraction = tokio::task::spawn_blocking(move || processor.extract(&bytes, &mime_type))
            .await
            .map_err(|e| AppError::Internal(format!("extraction task failed: {}", e)))?;

        match extraction {
            Extraction::Text(text) => Ok(text),
            Extraction::Unreadable { chars } => Err(AppError::ExtractionFailure(format!(
                "document yielded only {} readable characters (minimum {})",
                chars,
                self.processor.min_chars()
            ))),
            Extraction::Failed { reason } => Err(AppError::ExtractionFailure(format!(
                "Error parsing document: {}",
                reason
            ))),
            degraded @ (Extraction::Unsupported { .. } | Extraction::LegacyBinary { .. }) => {
                if self.extraction.allow_degraded {
                    warn!(record_id, extraction = %degraded, "Embedding placeholder text for unparsed document");
                    Ok(degraded.sentinel_text())
                } else {
                    Err(AppError::ExtractionFailure(degraded.sentinel_text()))
                }
            }
        }
    }
}

fn validate_limit(limit: i64) -> AppResult<usize> {
    if limit <= 0 {
        return Err(AppError::InvalidInput(format!("limit must be positive, got {}", limit)));
    }
    usize::try_from(limit).map_err(|_| AppError::InvalidInput(format!("limit out of range: {}", limit)))
}

/// The stage an ingestion failed in, with its error.
#[derive(Debug)]
struct IngestFailure {
    stage: IngestStage,
    error: AppError,
}

impl IngestFailure {
    fn at(stage: IngestStage) -> impl FnOnce(AppError) -> IngestFailure {
        move |error| IngestFailure { stage, error }
    }
}
