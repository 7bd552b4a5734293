use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::VectorRecordStore;
use crate::models::{Category, DocumentRecord};
use crate::types::AppResult;

/// Process-local store used when no database is configured, and in tests.
///
/// Scan order is first-insertion order; re-upserting an id replaces the
/// record in place and keeps its original `created_at`.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<RwLock<Vec<DocumentRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl VectorRecordStore for InMemoryRecordStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, record: &DocumentRecord) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        match guard.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = record.clone();
                existing.created_at = created_at;
            }
            None => guard.push(record.clone()),
        }
        Ok(())
    }

    async fn list_by_category(&self, category: Category) -> AppResult<Vec<DocumentRecord>> {
        let guard = self.inner.read().await;
        Ok(guard.iter().filter(|r| r.category == category).cloned().collect())
    }

    async fn get(&self, id: &str) -> AppResult<Option<DocumentRecord>> {
        let guard = self.inner.read().await;
        Ok(guard.iter().find(|r| r.id == id).cloned())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}
