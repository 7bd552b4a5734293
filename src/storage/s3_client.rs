// S3 blob store
// Objects are addressed by virtual-hosted URLs:
// https://{bucket}.s3.{region}.amazonaws.com/{key}

use anyhow::Context;
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::bucket::Bucket;
use s3::region::Region;
use tracing::{debug, info};

use super::BlobStore;
use crate::config::StorageConfig;
use crate::types::{AppError, AppResult};

pub struct S3BlobStore {
    bucket: Box<Bucket>,
    bucket_name: String,
    region: String,
}

impl S3BlobStore {
    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .context("loading S3 credentials")?;

        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .s3_region
                .parse::<Region>()
                .map_err(|e| anyhow::anyhow!("invalid S3 region {}: {}", config.s3_region, e))?,
        };

        let mut bucket = Bucket::new(&config.s3_bucket, region, credentials)
            .context("configuring S3 bucket")?;
        if config.s3_endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        info!(bucket = %config.s3_bucket, region = %config.s3_region, "S3 blob store ready");
        Ok(Self {
            bucket: Box::new(bucket),
            bucket_name: config.s3_bucket.clone(),
            region: config.s3_region.clone(),
        })
    }

    pub fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket_name, &self.region, key)
    }

    /// Accept a bare key, an `s3://bucket/key` URI or an object URL.
    pub fn key_from_uri(&self, uri: &str) -> AppResult<String> {
        key_from_uri(&self.bucket_name, uri)
    }
}

pub fn object_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}

pub fn key_from_uri(bucket: &str, uri: &str) -> AppResult<String> {
    let uri = uri.trim();

    let (bucket_in_uri, key) = if let Some(rest) = uri.strip_prefix("s3://") {
        match rest.split_once('/') {
            Some((b, k)) => (Some(b), k),
            None => (Some(rest), ""),
        }
    } else if let Some(rest) = uri
        .strip_prefix("https://")
        .or_else(|| uri.strip_prefix("http://"))
    {
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host_bucket = host.split('.').next().filter(|_| host.contains(".s3."));
        (host_bucket, path)
    } else {
        (None, uri)
    };

    if let Some(b) = bucket_in_uri {
        if b != bucket {
            return Err(AppError::InvalidInput(format!(
                "object belongs to bucket {}, expected {}",
                b, bucket
            )));
        }
    }
    let key = key.trim_start_matches('/');
    if key.is_empty() {
        return Err(AppError::InvalidInput(format!("no object key in {}", uri)));
    }
    Ok(key.to_string())
}

fn map_s3_error(key: &str, err: S3Error) -> AppError {
    match err {
        S3Error::HttpFailWithBody(404, _) => {
            AppError::NotFound(format!("File not found in S3: {}", key))
        }
        other => AppError::StoreUnavailable(format!("S3 request for {} failed: {}", key, other)),
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> AppResult<String> {
        let response = self
            .bucket
            .put_object(key, &bytes)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        debug!(key, status = response.status_code(), size = bytes.len(), "Uploaded object");
        Ok(self.object_url(key))
    }

    async fn get(&self, uri: &str) -> AppResult<Vec<u8>> {
        let key = self.key_from_uri(uri)?;
        let response = self
            .bucket
            .get_object(&key)
            .await
            .map_err(|e| map_s3_error(&key, e))?;

        match response.status_code() {
            200..=299 => Ok(response.bytes().to_vec()),
            404 => Err(AppError::NotFound(format!("File not found in S3: {}", key))),
            status => Err(AppError::StoreUnavailable(format!(
                "S3 returned status {} for {}",
                status, key
            ))),
        }
    }
}
