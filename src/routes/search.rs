use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::debug;

use super::error::{json_body, required};
use crate::models::{AppState, Category, SimilarityQuery, VectorSearchRequest, VectorSearchResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/vector_search", post(vector_search))
        .route("/api/search", post(vector_search))
        .with_state(state)
}

/// Top-K search by a raw vector, or by text embedded on the fly.
async fn vector_search(
    State(state): State<AppState>,
    payload: Result<Json<VectorSearchRequest>, JsonRejection>,
) -> AppResult<Json<VectorSearchResponse>> {
    let request = json_body(payload)?;
    const MISSING: &str = "Missing query embedding or search type";
    let category: Category = required(request.search_type, MISSING)?.parse()?;
    let limit = request.limit.unwrap_or_else(|| state.pipeline.default_limit());

    let report = match (request.query_embedding, request.query_text) {
        (Some(query_vector), _) if !query_vector.is_empty() => {
            state
                .pipeline
                .query(SimilarityQuery {
                    query_vector,
                    category,
                    limit,
                })
                .await?
        }
        (_, Some(text)) if !text.trim().is_empty() => {
            state.pipeline.query_text(&text, category, limit).await?
        }
        _ => return Err(AppError::InvalidInput(MISSING.to_string())),
    };

    debug!(category = %category, results = report.results.len(), skipped = report.skipped, "Search complete");
    Ok(Json(VectorSearchResponse {
        results: report.results,
        skipped: report.skipped,
    }))
}
