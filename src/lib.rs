// Resume matcher - résumé, job posting and course matching by text embeddings

pub mod config;
pub mod courses;
pub mod db;
pub mod embeddings;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use pipeline::MatchingPipeline;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
