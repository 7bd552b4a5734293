//! API Routes
//!
//! - `/upload_resume`, `/process_documents` - résumé upload and ingestion
//! - `/vector_search`, `/api/search` - similarity search
//! - `/api/ingest` - generic ingestion into any category
//! - `/api/resumes/{id}/courses` - course suggestions for a stored résumé
//! - `/generate_text`, `/rewrite_bullet` - text completion
//! - `/api/health` - health check

pub mod error;
pub mod generation;
pub mod health;
pub mod ingest;
pub mod resumes;
pub mod search;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server);

    Router::new()
        .merge(health::router(state.clone()))
        .merge(resumes::router(state.clone()))
        .merge(search::router(state.clone()))
        .merge(ingest::router(state.clone()))
        .merge(generation::router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
