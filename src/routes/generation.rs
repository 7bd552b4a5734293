use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::info;

use super::error::{json_body, required};
use crate::llm::TextCompletion;
use crate::models::{
    AppState, GenerateTextRequest, GenerateTextResponse, RewriteBulletRequest, RewriteBulletResponse,
};
use crate::types::{AppError, AppResult, CompletionRequest};

const ASSISTANT_INSTRUCTIONS: &str = "You are a helpful AI assistant.";

const REWRITE_INSTRUCTIONS: &str = "You are an expert resume writer. Your task is to rewrite a given resume bullet point to be more impactful, quantifiable, and tailored to a specific job description. Focus on achievements and results, using strong action verbs. Ensure the rewritten bullet point is concise and relevant to the job requirements.";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate_text", post(generate_text))
        .route("/rewrite_bullet", post(rewrite_bullet))
        .with_state(state)
}

fn completion(state: &AppState) -> AppResult<Arc<dyn TextCompletion>> {
    state
        .completion
        .clone()
        .ok_or_else(|| AppError::provider("text completion is not configured"))
}

async fn generate_text(
    State(state): State<AppState>,
    payload: Result<Json<GenerateTextRequest>, JsonRejection>,
) -> AppResult<Json<GenerateTextResponse>> {
    let request = json_body(payload)?;
    let prompt = required(request.prompt, "Missing prompt")?;
    let llm = completion(&state)?;

    let response = llm
        .complete(&CompletionRequest::new(ASSISTANT_INSTRUCTIONS, prompt))
        .await?;

    info!(provider = llm.provider_name(), tokens = response.usage.total_tokens, "Text generated");
    Ok(Json(GenerateTextResponse {
        generated_text: response.content,
    }))
}

pub fn rewrite_prompt(bullet_point: &str, job_description: &str) -> String {
    format!(
        "Original Resume Bullet Point: {}\n\nJob Description:\n{}\n\nRewrite the resume bullet point to be more impactful and relevant to the job description. Start directly with the rewritten bullet point, no introductory phrases.",
        bullet_point, job_description
    )
}

async fn rewrite_bullet(
    State(state): State<AppState>,
    payload: Result<Json<RewriteBulletRequest>, JsonRejection>,
) -> AppResult<Json<RewriteBulletResponse>> {
    let request = json_body(payload)?;
    const MISSING: &str = "Missing bullet point or job description";
    let bullet_point = required(request.bullet_point, MISSING)?;
    let job_description = required(request.job_description, MISSING)?;
    let llm = completion(&state)?;

    let response = llm
        .complete(&CompletionRequest::new(
            REWRITE_INSTRUCTIONS,
            rewrite_prompt(&bullet_point, &job_description),
        ))
        .await?;

    Ok(Json(RewriteBulletResponse {
        rewritten_bullet: response.content.trim().to_string(),
    }))
}
