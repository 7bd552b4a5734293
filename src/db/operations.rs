use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::models::{Category, DocumentRecord};
use crate::types::{AppError, AppResult};

/// Persistence for documents and their embeddings.
///
/// `upsert` replaces text, vector and metadata of an existing id in one
/// write; an existing primary key is never an error. `list_by_category`
/// returns every record of the category in the backend's scan order.
#[async_trait]
pub trait VectorRecordStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn upsert(&self, record: &DocumentRecord) -> AppResult<()>;

    async fn list_by_category(&self, category: Category) -> AppResult<Vec<DocumentRecord>>;

    async fn get(&self, id: &str) -> AppResult<Option<DocumentRecord>>;

    async fn health_check(&self) -> AppResult<()>;
}

/// Postgres-backed store. Embeddings are kept as JSON text arrays so the
/// schema needs no vector extension.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

// Note: FromRow is needed for runtime query_as (without DATABASE_URL at compile time)
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    category: String,
    source_uri: String,
    title: Option<String>,
    raw_text: String,
    embedding: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_record(self) -> AppResult<DocumentRecord> {
        let category = self.category.parse::<Category>().map_err(|_| {
            AppError::Internal(format!(
                "record {} has unknown category {:?}",
                self.id, self.category
            ))
        })?;

        // An unparseable vector is kept as empty so ranking skips the row.
        let embedding = decode_embedding(&self.embedding).unwrap_or_else(|e| {
            warn!(record_id = %self.id, error = %e, "Stored embedding is not a float array");
            Vec::new()
        });

        Ok(DocumentRecord {
            id: self.id,
            category,
            source_uri: self.source_uri,
            title: self.title,
            raw_text: self.raw_text,
            embedding,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

pub fn encode_embedding(embedding: &[f64]) -> AppResult<String> {
    serde_json::to_string(embedding)
        .map_err(|e| AppError::Internal(format!("failed to serialize embedding: {}", e)))
}

pub fn decode_embedding(raw: &str) -> Result<Vec<f64>, serde_json::Error> {
    serde_json::from_str(raw)
}

const SELECT_COLUMNS: &str =
    "SELECT id, category, source_uri, title, raw_text, embedding, metadata, created_at FROM documents";

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorRecordStore for PgRecordStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn upsert(&self, record: &DocumentRecord) -> AppResult<()> {
        let embedding = encode_embedding(&record.embedding)?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, category, source_uri, title, raw_text, embedding, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                category = EXCLUDED.category,
                source_uri = EXCLUDED.source_uri,
                title = EXCLUDED.title,
                raw_text = EXCLUDED.raw_text,
                embedding = EXCLUDED.embedding,
                metadata = EXCLUDED.metadata,
                updated_at = NOW()
            "#,
        )
        .bind(&record.id)
        .bind(record.category.as_str())
        .bind(&record.source_uri)
        .bind(&record.title)
        .bind(&record.raw_text)
        .bind(embedding)
        .bind(&record.metadata)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        debug!(record_id = %record.id, category = %record.category, "Record upserted");
        Ok(())
    }

    async fn list_by_category(&self, category: Category) -> AppResult<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "{} WHERE category = $1 ORDER BY created_at ASC, id ASC",
            SELECT_COLUMNS
        ))
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentRow::into_record).collect()
    }

    async fn get(&self, id: &str) -> AppResult<Option<DocumentRecord>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(DocumentRow::into_record).transpose()
    }

    async fn health_check(&self) -> AppResult<()> {
        super::pool::health_check(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_text_encoding() {
        let encoded = encode_embedding(&[0.25, -1.0, 3.5]).unwrap();
        assert_eq!(encoded, "[0.25,-1.0,3.5]");
        assert_eq!(decode_embedding(&encoded).unwrap(), vec![0.25, -1.0, 3.5]);
        assert!(decode_embedding("not json").is_err());
    }

    #[test]
    fn test_row_with_bad_embedding_keeps_record() {
        let row = DocumentRow {
            id: "r1".to_string(),
            category: "course".to_string(),
            source_uri: "fixture://r1".to_string(),
            title: None,
            raw_text: "text".to_string(),
            embedding: "{oops".to_string(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        };
        let record = row.into_record().unwrap();
        assert_eq!(record.category, Category::Course);
        assert!(record.embedding.is_empty());
    }

    #[test]
    fn test_row_with_unknown_category_is_internal_error() {
        let row = DocumentRow {
            id: "r2".to_string(),
            category: "podcast".to_string(),
            source_uri: String::new(),
            title: None,
            raw_text: String::new(),
            embedding: "[]".to_string(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        };
        assert_eq!(row.into_record().unwrap_err().kind(), "internal");
    }
}
