//! Exact cosine-similarity ranking over a scanned candidate set.
//!
//! There is no index: every candidate is scored. This is meant for catalogs
//! of up to a few thousand rows.

use tracing::warn;

use crate::models::{DocumentRecord, SimilarityResult};
use crate::types::{AppError, AppResult};

/// Default preview length, in characters.
pub const PREVIEW_CHARS: usize = 200;

/// A candidate with its score, borrowed from the scanned set.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub record: &'a DocumentRecord,
    pub score: f64,
    pub rank: usize,
}

impl ScoredCandidate<'_> {
    pub fn to_result(&self, preview_chars: usize) -> SimilarityResult {
        SimilarityResult {
            record_id: self.record.id.clone(),
            title: self.record.title.clone(),
            source_uri: self.record.source_uri.clone(),
            preview_text: preview(&self.record.raw_text, preview_chars),
            score: self.score,
            rank: self.rank,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankOutcome<'a> {
    pub results: Vec<ScoredCandidate<'a>>,
    /// Candidates dropped because their vector length differed from the query's.
    pub skipped: usize,
}

/// `dot(a, b) / (|a| * |b|)`.
///
/// Each side is divided by its largest absolute component first, so very
/// large or very small finite vectors neither overflow nor underflow. Only an
/// all-zero vector counts as zero-magnitude and scores `0.0`; non-finite
/// components also score `0.0`. Slices of unequal length are compared over
/// their common prefix; use [`try_cosine_similarity`] when a mismatch must be
/// reported.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let scale_a = max_abs(a);
    let scale_b = max_abs(b);
    if scale_a == 0.0 || scale_b == 0.0 {
        return 0.0;
    }
    if !scale_a.is_finite() || !scale_b.is_finite() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (x / scale_a, y / scale_b);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Largest `|x|`; NaN components are ignored here and surface in the score.
fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0f64, |m, x| m.max(x.abs()))
}

pub fn try_cosine_similarity(a: &[f64], b: &[f64]) -> AppResult<f64> {
    if a.len() != b.len() {
        return Err(AppError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(cosine_similarity(a, b))
}

/// Score every candidate against `query`, best first, at most `limit` entries.
///
/// Equal scores keep the candidates' scan order. A candidate whose vector
/// length differs from the query's is skipped and counted.
pub fn rank<'a>(
    query: &[f64],
    candidates: &'a [DocumentRecord],
    limit: usize,
) -> AppResult<RankOutcome<'a>> {
    if limit == 0 {
        return Err(AppError::InvalidInput("limit must be positive".to_string()));
    }
    if query.is_empty() {
        return Err(AppError::InvalidInput("query vector must not be empty".to_string()));
    }

    let mut skipped = 0usize;
    let mut scored: Vec<ScoredCandidate<'a>> = Vec::with_capacity(candidates.len());

    for record in candidates {
        match try_cosine_similarity(query, &record.embedding) {
            Ok(score) => scored.push(ScoredCandidate { record, score, rank: 0 }),
            Err(e) => {
                skipped += 1;
                warn!(record_id = %record.id, category = %record.category, error = %e, "Skipping candidate");
            }
        }
    }

    // Stable sort: ties keep scan order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    for (i, candidate) in scored.iter_mut().enumerate() {
        candidate.rank = i + 1;
    }

    Ok(RankOutcome { results: scored, skipped })
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}
