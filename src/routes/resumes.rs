use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::info;

use super::error::{json_body, required};
use crate::models::{
    AppState, Category, ProcessDocumentsRequest, ProcessDocumentsResponse, UploadResumeRequest,
    UploadResumeResponse, VectorSearchResponse,
};
use crate::pipeline::IngestRequest;
use crate::storage::object_key;
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload_resume", post(upload_resume))
        .route("/process_documents", post(process_documents))
        .route("/api/resumes/{id}/courses", get(course_suggestions))
        .with_state(state)
}

async fn upload_resume(
    State(state): State<AppState>,
    payload: Result<Json<UploadResumeRequest>, JsonRejection>,
) -> AppResult<Json<UploadResumeResponse>> {
    let request = json_body(payload)?;
    const MISSING: &str = "Missing resume file, name, type, or job posting text";
    let file_b64 = required(request.resume_file_base64, MISSING)?;
    let file_name = required(request.resume_file_name, MISSING)?;
    let file_type = required(request.resume_file_type, MISSING)?;
    let job_posting_text = required(request.job_posting_text, MISSING)?;

    let bytes = STANDARD
        .decode(file_b64.trim())
        .map_err(|e| AppError::InvalidInput(format!("resume file is not valid base64: {}", e)))?;
    let key = object_key(&state.config.storage.resume_prefix, &file_name)?;
    let size = bytes.len();
    let s3_url = state.blobs.put(&key, bytes).await?;

    info!(key = %key, size, "Resume uploaded");
    Ok(Json(UploadResumeResponse {
        message: "File uploaded successfully!".to_string(),
        s3_url,
        job_posting_text,
        resume_file_type: file_type,
    }))
}

/// Fetch an uploaded résumé, then ingest it and the job posting it was sent with.
async fn process_documents(
    State(state): State<AppState>,
    payload: Result<Json<ProcessDocumentsRequest>, JsonRejection>,
) -> AppResult<Json<ProcessDocumentsResponse>> {
    let request = json_body(payload)?;
    const MISSING: &str = "Missing S3 URL, resume file type, or job posting text";
    let s3_url = required(request.s3_url, MISSING)?;
    let file_type = required(request.resume_file_type, MISSING)?;
    let job_posting_text = required(request.job_posting_text, MISSING)?;

    let bytes = state.blobs.get(&s3_url).await?;
    let file_name = s3_url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let mut resume_request = IngestRequest::document(Category::Resume, bytes, file_type)
        .with_source(s3_url.clone())
        .with_metadata(serde_json::json!({ "file_name": file_name.clone() }));
    resume_request.title = file_name;
    let resume = state.pipeline.ingest(resume_request).await?;

    let job = state
        .pipeline
        .ingest(IngestRequest::text(Category::JobPosting, job_posting_text))
        .await?;

    info!(resume_id = %resume.record_id, job_posting_id = %job.record_id, "Documents processed");
    Ok(Json(ProcessDocumentsResponse {
        resume_id: resume.record_id,
        job_posting_id: job.record_id,
        parsed_resume_text: resume.text,
        parsed_job_posting_text: job.text,
        resume_embedding: resume.embedding,
        job_posting_embedding: job.embedding,
    }))
}

#[derive(Debug, serde::Deserialize)]
struct LimitParams {
    limit: Option<i64>,
}

async fn course_suggestions(
    State(state): State<AppState>,
    Path(resume_id): Path<String>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<VectorSearchResponse>> {
    let limit = params.limit.unwrap_or_else(|| state.pipeline.default_limit());
    let report = state.pipeline.match_resume(&resume_id, limit).await?;
    Ok(Json(VectorSearchResponse {
        results: report.results,
        skipped: report.skipped,
    }))
}
