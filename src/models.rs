use std::sync::Arc;

use crate::config::Config;
use crate::llm::TextCompletion;
use crate::pipeline::MatchingPipeline;
use crate::storage::BlobStore;
use crate::types::AppError;

/// Services shared by every request handler.
///
/// Everything in here is constructed once in `main` and injected; nothing is
/// looked up from globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: MatchingPipeline,
    pub blobs: Arc<dyn BlobStore>,
    pub completion: Option<Arc<dyn TextCompletion>>,
}

// =============================================================================
// Core records
// =============================================================================

/// What kind of entity a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Resume,
    JobPosting,
    Course,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Resume, Category::JobPosting, Category::Course];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Resume => "resume",
            Category::JobPosting => "job_posting",
            Category::Course => "course",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = AppError;

    /// Accepts the singular names and the plural search types the web client sends.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "resume" | "resumes" => Ok(Category::Resume),
            "job_posting" | "job_postings" | "job" | "jobs" => Ok(Category::JobPosting),
            "course" | "courses" => Ok(Category::Course),
            other => Err(AppError::InvalidInput(format!("invalid search type: {}", other))),
        }
    }
}

/// A persisted document together with the vector computed from its text.
///
/// `raw_text` and `embedding` are only ever replaced together, by re-ingesting
/// under the same `id`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub category: Category,
    pub source_uri: String,
    pub title: Option<String>,
    pub raw_text: String,
    pub embedding: Vec<f64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Ephemeral top-K request over one category.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimilarityQuery {
    pub query_vector: Vec<f64>,
    pub category: Category,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimilarityResult {
    pub record_id: String,
    pub title: Option<String>,
    pub source_uri: String,
    pub preview_text: String,
    pub score: f64,
    pub rank: usize,
}

// =============================================================================
// API Request/Response types
// =============================================================================

/// Body of `POST /upload_resume`, field names as sent by the web client.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResumeRequest {
    pub resume_file_base64: Option<String>,
    pub resume_file_name: Option<String>,
    pub resume_file_type: Option<String>,
    pub job_posting_text: Option<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResumeResponse {
    pub message: String,
    pub s3_url: String,
    pub job_posting_text: String,
    pub resume_file_type: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDocumentsRequest {
    pub s3_url: Option<String>,
    pub resume_file_type: Option<String>,
    pub job_posting_text: Option<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDocumentsResponse {
    pub resume_id: String,
    pub job_posting_id: String,
    pub parsed_resume_text: String,
    pub parsed_job_posting_text: String,
    pub resume_embedding: Vec<f64>,
    pub job_posting_embedding: Vec<f64>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearchRequest {
    #[serde(alias = "query_embedding", alias = "query_vector")]
    pub query_embedding: Option<Vec<f64>>,
    #[serde(alias = "query_text")]
    pub query_text: Option<String>,
    #[serde(alias = "search_type", alias = "category")]
    pub search_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
pub struct VectorSearchResponse {
    pub results: Vec<SimilarityResult>,
    pub skipped: usize,
}

/// Generic ingestion body for `POST /api/ingest`.
#[derive(Debug, serde::Deserialize)]
pub struct IngestApiRequest {
    pub id: Option<String>,
    pub category: String,
    pub source_uri: Option<String>,
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub content_base64: Option<String>,
    pub associated_text: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
pub struct GenerateTextRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct GenerateTextResponse {
    pub generated_text: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteBulletRequest {
    pub bullet_point: Option<String>,
    pub job_description: Option<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteBulletResponse {
    pub rewritten_bullet: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub store: String,
    pub embedding_provider: String,
    pub embedding_dimension: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parses_plural_search_types() {
        assert_eq!("courses".parse::<Category>().unwrap(), Category::Course);
        assert_eq!("resumes".parse::<Category>().unwrap(), Category::Resume);
        assert_eq!("job-posting".parse::<Category>().unwrap(), Category::JobPosting);
        assert!("videos".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&Category::JobPosting).unwrap();
        assert_eq!(json, "\"job_posting\"");
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }
}
