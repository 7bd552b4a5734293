//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use docx_rust::document::Paragraph;
use docx_rust::Docx;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use resume_matcher::config::{ExtractionConfig, SearchConfig};
use resume_matcher::db::InMemoryRecordStore;
use resume_matcher::embeddings::hashing::HashingEmbedder;
use resume_matcher::embeddings::EmbeddingProvider;
use resume_matcher::pipeline::MatchingPipeline;
use resume_matcher::types::{AppError, AppResult};

pub const TEST_DIM: usize = 64;

pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("resume.docx");
    let mut docx = Docx::default();
    for text in paragraphs {
        docx.document.push(Paragraph::default().push_text(*text));
    }
    docx.write_file(&path).unwrap();
    std::fs::read(&path).unwrap()
}

/// Single-page PDF showing `page_text` in Courier.
pub fn pdf_bytes(page_text: &str) -> Vec<u8> {
    pdf_pages(&[page_text])
}

/// One Courier text line per page, pages in the given order.
pub fn pdf_pages(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page_text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*page_text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Always fails, counting how often it was asked.
pub struct FailingProvider {
    pub calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn provider_id(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        TEST_DIM
    }

    async fn embed_one(&self, _text: &str) -> AppResult<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::provider("embedding backend unreachable"))
    }
}

pub fn pipeline_with(
    provider: Arc<dyn EmbeddingProvider>,
    extraction: ExtractionConfig,
) -> (MatchingPipeline, InMemoryRecordStore) {
    let store = InMemoryRecordStore::new();
    let pipeline = MatchingPipeline::new(
        provider,
        Arc::new(store.clone()),
        extraction,
        SearchConfig::default(),
    );
    (pipeline, store)
}

pub fn hashing_pipeline() -> (MatchingPipeline, InMemoryRecordStore) {
    pipeline_with(Arc::new(HashingEmbedder::new(TEST_DIM)), ExtractionConfig::default())
}
