// HTTP mapping for AppError

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::types::{AppError, AppResult};

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ExtractionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderFailure { .. } => StatusCode::BAD_GATEWAY,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::StoreWriteConflict(_) => StatusCode::CONFLICT,
            AppError::DimensionMismatch { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Request failed");
        }
        let body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "class": self.class(),
        });
        (status, Json(body)).into_response()
    }
}

/// Unwrap a JSON body, reporting malformed input as `InvalidInput`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidInput(format!("Invalid JSON: {}", rejection.body_text())))
}

/// A required string field; blank counts as missing.
pub fn required(value: Option<String>, message: &str) -> AppResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput(message.to_string()))
}
