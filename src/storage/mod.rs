// Blob storage for raw uploaded files (S3-compatible, or in memory)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};

pub mod s3_client;

pub use s3_client::*;

/// Raw file storage. `get` reports a missing object as `NotFound`, distinct
/// from `StoreUnavailable` for transport or service trouble.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` and return the URI it can be fetched by.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> AppResult<String>;

    async fn get(&self, uri: &str) -> AppResult<Vec<u8>>;
}

#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

const MEMORY_SCHEME: &str = "memory://";

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> AppResult<String> {
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(format!("{}{}", MEMORY_SCHEME, key))
    }

    async fn get(&self, uri: &str) -> AppResult<Vec<u8>> {
        let key = uri.strip_prefix(MEMORY_SCHEME).unwrap_or(uri);
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("File not found in storage: {}", key)))
    }
}

/// Pick the blob store named in configuration.
pub fn create_blob_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config.provider.as_str() {
        "s3" if !config.s3_bucket.is_empty() => Ok(Arc::new(S3BlobStore::from_config(config)?)),
        "s3" => {
            warn!("S3_BUCKET not set, uploads are kept in memory");
            Ok(Arc::new(InMemoryBlobStore::new()))
        }
        "memory" => Ok(Arc::new(InMemoryBlobStore::new())),
        other => anyhow::bail!("unsupported STORAGE_PROVIDER: {}", other),
    }
}

/// Object key for an uploaded file: `{prefix}/{file name without directories}`.
pub fn object_key(prefix: &str, file_name: &str) -> AppResult<String> {
    let name = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(AppError::InvalidInput(format!("invalid file name: {:?}", file_name)));
    }
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(name.to_string())
    } else {
        Ok(format!("{}/{}", prefix, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_roundtrip_and_not_found() {
        let store = InMemoryBlobStore::new();
        let uri = store.put("resumes/cv.pdf", b"%PDF".to_vec()).await.unwrap();
        assert_eq!(uri, "memory://resumes/cv.pdf");
        assert_eq!(store.get(&uri).await.unwrap(), b"%PDF".to_vec());

        let err = store.get("memory://resumes/missing.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_object_key_strips_directories() {
        assert_eq!(object_key("resumes", "cv.pdf").unwrap(), "resumes/cv.pdf");
        assert_eq!(object_key("/resumes/", "../../etc/cv.pdf").unwrap(), "resumes/cv.pdf");
        assert_eq!(object_key("", "C:\\docs\\cv.docx").unwrap(), "cv.docx");
        assert!(object_key("resumes", "..").is_err());
        assert!(object_key("resumes", "dir/").is_err());
    }
}
