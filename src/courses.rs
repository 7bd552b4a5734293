//! Course catalog loading for the `ingest-courses` command.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::Category;
use crate::pipeline::{IngestRequest, MatchingPipeline};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl Course {
    /// The text a course is embedded from: name, description and skills.
    pub fn embedding_text(&self) -> String {
        format!(
            "{}. {}. Skills: {}",
            self.name,
            self.description,
            self.skills.join(", ")
        )
    }

    pub fn into_request(self) -> IngestRequest {
        let text = self.embedding_text();
        IngestRequest::text(Category::Course, text)
            .with_id(self.id)
            .with_title(self.name)
            .with_source(self.url)
            .with_metadata(serde_json::json!({
                "description": self.description,
                "skills": self.skills,
            }))
    }
}

pub fn load_courses(path: &Path) -> anyhow::Result<Vec<Course>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read course catalog {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid course catalog {}", path.display()))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    pub ingested: usize,
    pub failed: usize,
}

/// Upsert every course by id. A failing course is logged and skipped.
pub async fn ingest_courses(pipeline: &MatchingPipeline, courses: Vec<Course>) -> CatalogSummary {
    let mut summary = CatalogSummary::default();
    for course in courses {
        let name = course.name.clone();
        match pipeline.ingest(course.into_request()).await {
            Ok(report) => {
                summary.ingested += 1;
                info!(course_id = %report.record_id, name = %name, "Inserted/updated course");
            }
            Err(e) => {
                summary.failed += 1;
                warn!(name = %name, error = %e, "Error ingesting course");
            }
        }
    }
    summary
}
