use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
    pub llm: LLMConfig,
    pub extraction: ExtractionConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the service runs on the in-memory record store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAI,
    /// Offline feature hashing, deterministic
    Hashing,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(EmbeddingBackend::OpenAI),
            "hashing" | "local" | "fake" => Ok(EmbeddingBackend::Hashing),
            other => anyhow::bail!("unsupported EMBEDDING_PROVIDER: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Output dimensionality D; every stored vector has this length.
    pub dimensions: usize,
    pub timeout_secs: u64,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub provider: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub resume_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Cleaned PDF text shorter than this is reported as unreadable.
    pub min_chars: usize,
    /// Embed sentinel text for unsupported / legacy formats instead of aborting.
    pub allow_degraded: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_chars: 50,
            allow_degraded: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub default_limit: i64,
    pub preview_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            preview_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    /// Directory for a daily-rolling log file, in addition to stdout.
    pub dir: Option<String>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(key, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("invalid value for {}: {} ({})", key, raw, e))
}

/// First set variable among `keys`.
fn first_var(keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| env::var(k).ok())
        .filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_default();

        Ok(Self {
            server: ServerConfig {
                port: parse_var("PORT", "5000")?,
                host: var_or("HOST", "0.0.0.0"),
                cors_allowed_origins: var_or("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            database: DatabaseConfig {
                url: first_var(&["DATABASE_URL"]),
                max_connections: parse_var("DB_MAX_CONNECTIONS", "10")?,
                min_connections: parse_var("DB_MIN_CONNECTIONS", "1")?,
                acquire_timeout_secs: parse_var("DB_ACQUIRE_TIMEOUT_SECS", "5")?,
            },
            embedding: EmbeddingConfig {
                backend: var_or("EMBEDDING_PROVIDER", "openai")
                    .parse()
                    .context("reading EMBEDDING_PROVIDER")?,
                api_key: first_var(&["EMBEDDING_API_KEY"]).unwrap_or_else(|| openai_api_key.clone()),
                base_url: var_or("EMBEDDING_BASE_URL", "https://api.openai.com/v1"),
                model: var_or("EMBEDDING_MODEL", "text-embedding-3-small"),
                dimensions: parse_var("EMBEDDING_DIMENSIONS", "384")?,
                timeout_secs: parse_var("EMBEDDING_TIMEOUT_SECS", "30")?,
                concurrency: parse_var("EMBEDDING_CONCURRENCY", "4")?,
            },
            storage: StorageConfig {
                provider: var_or("STORAGE_PROVIDER", "s3"),
                s3_bucket: first_var(&["S3_BUCKET", "AWS_S3_BUCKET_NAME"]).unwrap_or_default(),
                s3_region: first_var(&["S3_REGION", "AWS_REGION"])
                    .unwrap_or_else(|| "us-east-1".to_string()),
                s3_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                s3_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                s3_endpoint: env::var("S3_ENDPOINT").ok(),
                resume_prefix: var_or("S3_RESUME_PREFIX", "resumes"),
            },
            llm: LLMConfig {
                provider: var_or("LLM_PROVIDER", "anthropic")
                    .parse()
                    .map_err(|e| anyhow::anyhow!("reading LLM_PROVIDER: {}", e))?,
                anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
                openai_api_key,
                model: var_or("LLM_MODEL", "claude-3-haiku-20240307"),
                temperature: parse_var("LLM_TEMPERATURE", "0.7")?,
                max_tokens: parse_var("LLM_MAX_TOKENS", "1024")?,
                timeout_secs: parse_var("LLM_TIMEOUT_SECS", "60")?,
            },
            extraction: ExtractionConfig {
                min_chars: parse_var("EXTRACTION_MIN_CHARS", "50")?,
                allow_degraded: parse_var("EXTRACTION_ALLOW_DEGRADED", "false")?,
            },
            search: SearchConfig {
                default_limit: parse_var("SEARCH_DEFAULT_LIMIT", "5")?,
                preview_chars: parse_var("SEARCH_PREVIEW_CHARS", "200")?,
            },
            logging: LoggingConfig {
                filter: var_or(
                    "RUST_LOG",
                    "resume_matcher=debug,tower_http=debug,axum=debug",
                ),
                dir: first_var(&["LOG_DIR"]),
            },
        })
    }
}

impl Default for Config {
    /// Fully offline: in-memory stores, hashing embedder, no completion keys.
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 5000,
                host: "0.0.0.0".to_string(),
                cors_allowed_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_secs: 5,
            },
            embedding: EmbeddingConfig {
                backend: EmbeddingBackend::Hashing,
                api_key: String::new(),
                base_url: "https://api.openai.com/v1".to_string(),
                model: "text-embedding-3-small".to_string(),
                dimensions: 384,
                timeout_secs: 30,
                concurrency: 4,
            },
            storage: StorageConfig {
                provider: "memory".to_string(),
                s3_bucket: String::new(),
                s3_region: "us-east-1".to_string(),
                s3_access_key_id: None,
                s3_secret_access_key: None,
                s3_endpoint: None,
                resume_prefix: "resumes".to_string(),
            },
            llm: LLMConfig {
                provider: LLMProvider::Anthropic,
                anthropic_api_key: String::new(),
                openai_api_key: String::new(),
                model: "claude-3-haiku-20240307".to_string(),
                temperature: 0.7,
                max_tokens: 1024,
                timeout_secs: 60,
            },
            extraction: ExtractionConfig::default(),
            search: SearchConfig::default(),
            logging: LoggingConfig {
                filter: "resume_matcher=debug,tower_http=debug,axum=debug".to_string(),
                dir: None,
            },
        }
    }
}
