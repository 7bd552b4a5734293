use axum::{extract::State, routing::get, Json, Router};
use tracing::warn;

use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Resume matcher API is running!",
        "endpoints": {
            "upload_resume": "/upload_resume (POST)",
            "process_documents": "/process_documents (POST)",
            "vector_search": "/vector_search (POST)",
            "generate_text": "/generate_text (POST)",
            "rewrite_bullet": "/rewrite_bullet (POST)",
            "ingest": "/api/ingest (POST)",
            "search": "/api/search (POST)",
            "course_suggestions": "/api/resumes/{id}/courses (GET)",
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.pipeline.store();
    let status = match store.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            warn!(store = store.backend_name(), error = %e, "Store health check failed");
            "degraded"
        }
    };

    let provider = state.pipeline.provider();
    Json(HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        store: store.backend_name().to_string(),
        embedding_provider: provider.provider_id().to_string(),
        embedding_dimension: provider.dimension(),
    })
}
