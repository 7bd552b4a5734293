// Type definitions and enums

/// Supported text-completion backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    Anthropic,
    OpenAI,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LLMProvider::Anthropic),
            "openai" => Ok(LLMProvider::OpenAI),
            other => Err(AppError::InvalidInput(format!(
                "unsupported LLM provider: {}",
                other
            ))),
        }
    }
}

/// A single completion call: system instructions plus the user text.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompletionRequest {
    pub system_instructions: String,
    pub user_text: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(system_instructions: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system_instructions: system_instructions.into(),
            user_text: user_text.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// How a caller should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request itself was wrong; retrying unchanged will fail again.
    FixInput,
    /// A dependency was unavailable; the same request may succeed later.
    RetryLater,
    /// Stored data or a backend contract is inconsistent.
    DataIntegrity,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider failure: {message}")]
    ProviderFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store write conflict: {0}")]
    StoreWriteConflict(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn provider(message: impl Into<String>) -> Self {
        AppError::ProviderFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn provider_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AppError::ProviderFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Stable machine-readable kind, used in HTTP bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::ExtractionFailure(_) => "extraction_failure",
            AppError::NotFound(_) => "not_found",
            AppError::ProviderFailure { .. } => "provider_failure",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::StoreWriteConflict(_) => "store_write_conflict",
            AppError::DimensionMismatch { .. } => "dimension_mismatch",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::InvalidInput(_) | AppError::ExtractionFailure(_) | AppError::NotFound(_) => {
                ErrorClass::FixInput
            }
            AppError::ProviderFailure { .. } | AppError::StoreUnavailable(_) => {
                ErrorClass::RetryLater
            }
            AppError::StoreWriteConflict(_)
            | AppError::DimensionMismatch { .. }
            | AppError::Internal(_) => ErrorClass::DataIntegrity,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::StoreWriteConflict(db.message().to_string())
            }
            sqlx::Error::Database(db) => AppError::Internal(db.message().to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_) => AppError::Internal(err.to_string()),
            _ => AppError::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "provider request timed out".to_string()
        } else {
            format!("provider request failed: {}", err)
        };
        AppError::provider_with(message, err)
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
