//! HTTP surface tests against an offline router.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use resume_matcher::llm::TextCompletion;
use resume_matcher::storage::InMemoryBlobStore;
use resume_matcher::types::{AppResult, CompletionRequest, CompletionResponse, TokenUsage};
use resume_matcher::{create_router, AppState, Config};

/// Echoes the user text back, upper-cased.
struct EchoCompletion;

#[async_trait]
impl TextCompletion for EchoCompletion {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        Ok(CompletionResponse {
            content: format!("  {}  ", request.user_text.to_uppercase()),
            finish_reason: "stop".to_string(),
            usage: TokenUsage::default(),
        })
    }
}

fn app(with_completion: bool) -> Router {
    let (pipeline, _store) = hashing_pipeline();
    let completion: Option<Arc<dyn TextCompletion>> = if with_completion {
        Some(Arc::new(EchoCompletion))
    } else {
        None
    };
    create_router(AppState {
        config: Config::default(),
        pipeline,
        blobs: Arc::new(InMemoryBlobStore::new()),
        completion,
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_store_and_provider() {
    let app = app(false);
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["embedding_dimension"], TEST_DIM);
}

#[tokio::test]
async fn test_upload_then_process_then_suggest_courses() {
    let app = app(false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/ingest",
        Some(json!({
            "id": "course-go",
            "category": "course",
            "title": "Go in Production",
            "associated_text": "Go in Production. Concurrency with goroutines. Skills: Go, gRPC",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let docx = docx_bytes(&["Senior Engineer", "5 years Go experience"]);
    let (status, upload) = send(
        &app,
        "POST",
        "/upload_resume",
        Some(json!({
            "resumeFileBase64": STANDARD.encode(&docx),
            "resumeFileName": "jane.docx",
            "resumeFileType": "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "jobPostingText": "Backend engineer, Go and Kubernetes",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upload["s3Url"], "memory://resumes/jane.docx");

    let (status, processed) = send(
        &app,
        "POST",
        "/process_documents",
        Some(json!({
            "s3Url": upload["s3Url"],
            "resumeFileType": upload["resumeFileType"],
            "jobPostingText": upload["jobPostingText"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(processed["parsedResumeText"], "Senior Engineer\n5 years Go experience\n");
    assert_eq!(processed["resumeEmbedding"].as_array().unwrap().len(), TEST_DIM);
    assert_eq!(processed["jobPostingEmbedding"].as_array().unwrap().len(), TEST_DIM);

    let resume_id = processed["resumeId"].as_str().unwrap();
    let (status, suggestions) =
        send(&app, "GET", &format!("/api/resumes/{}/courses?limit=1", resume_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(suggestions["results"][0]["record_id"], "course-go");
}

#[tokio::test]
async fn test_vector_search_by_embedding_and_text() {
    let app = app(false);
    for (id, text) in [("a", "Cloud Computing with AWS. Skills: EC2, S3"), ("b", "Cybersecurity Basics. Skills: Network Security")] {
        send(
            &app,
            "POST",
            "/api/ingest",
            Some(json!({ "id": id, "category": "courses", "associated_text": text })),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        "POST",
        "/vector_search",
        Some(json!({ "queryText": "AWS cloud EC2", "searchType": "courses", "limit": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["record_id"], "a");

    let (status, body) = send(
        &app,
        "POST",
        "/api/search",
        Some(json!({ "query_embedding": vec![0.5; TEST_DIM + 1], "category": "course" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 0);
    assert_eq!(body["skipped"], 2);
}

#[tokio::test]
async fn test_error_bodies_carry_kind() {
    let app = app(false);

    let (status, body) = send(&app, "POST", "/vector_search", Some(json!({ "searchType": "courses" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
    assert_eq!(body["class"], "fix_input");

    let (status, body) = send(
        &app,
        "POST",
        "/vector_search",
        Some(json!({ "queryText": "rust", "searchType": "videos" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid search type"));

    let (status, body) = send(
        &app,
        "POST",
        "/process_documents",
        Some(json!({
            "s3Url": "memory://resumes/nobody.pdf",
            "resumeFileType": "application/pdf",
            "jobPostingText": "anything",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/api/ingest",
        Some(json!({
            "category": "resume",
            "mime_type": "application/pdf",
            "content_base64": STANDARD.encode(pdf_bytes("Hi")),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "extraction_failure");
}

#[tokio::test]
async fn test_generation_endpoints() {
    let app = app(true);

    let (status, body) = send(&app, "POST", "/generate_text", Some(json!({ "prompt": "hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generated_text"], "  HELLO  ");

    let (status, body) = send(
        &app,
        "POST",
        "/rewrite_bullet",
        Some(json!({ "bulletPoint": "managed servers", "jobDescription": "sre" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["rewrittenBullet"]
        .as_str()
        .unwrap()
        .starts_with("ORIGINAL RESUME BULLET POINT: MANAGED SERVERS"));

    let (status, _) = send(&app, "POST", "/rewrite_bullet", Some(json!({ "bulletPoint": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generation_without_completion_is_provider_failure() {
    let app = app(false);
    let (status, body) = send(&app, "POST", "/generate_text", Some(json!({ "prompt": "hello" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "provider_failure");
    assert_eq!(body["class"], "retry_later");
}

#[tokio::test]
async fn test_ingest_rejects_document_and_text_together() {
    let app = app(false);
    let (status, body) = send(
        &app,
        "POST",
        "/api/ingest",
        Some(json!({
            "category": "resume",
            "mime_type": "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "content_base64": STANDARD.encode(docx_bytes(&["Senior Engineer"])),
            "associated_text": "Backend engineer, Go",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    let (_, health) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(health["status"], "ok");
}
