use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::error::json_body;
use crate::models::{AppState, Category, IngestApiRequest};
use crate::pipeline::{IngestContent, IngestReport, IngestRequest};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ingest", post(ingest))
        .with_state(state)
}

/// Ingest a base64 document (with its MIME type) or plain text into any category.
async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<IngestApiRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<IngestReport>)> {
    let request = json_body(payload)?;
    let category: Category = request.category.parse()?;

    let content = match (request.content_base64, request.associated_text) {
        (Some(_), Some(_)) => {
            return Err(AppError::InvalidInput(
                "send either content_base64 or associated_text, not both".to_string(),
            ))
        }
        (Some(encoded), None) => {
            let mime_type = request
                .mime_type
                .filter(|m| !m.trim().is_empty())
                .ok_or_else(|| AppError::InvalidInput("mime_type is required with content_base64".to_string()))?;
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| AppError::InvalidInput(format!("content is not valid base64: {}", e)))?;
            IngestContent::Document { bytes, mime_type }
        }
        (None, Some(text)) => IngestContent::Text(text),
        (None, None) => {
            return Err(AppError::InvalidInput(
                "one of content_base64 or associated_text is required".to_string(),
            ))
        }
    };

    let report = state
        .pipeline
        .ingest(IngestRequest {
            id: request.id,
            category,
            source_uri: request.source_uri.unwrap_or_default(),
            title: request.title,
            content,
            metadata: request.metadata,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}
