use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::attempt::AttemptStatus;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    /// Unreadable or unsupported resume document. Recoverable by re-upload.
    #[error("Could not parse resume {file_ref}: {reason}")]
    ParseFailure { file_ref: String, reason: String },

    /// Generation backend could not produce a usable question set. Recoverable by retry.
    #[error("Exam generation failed: {0}")]
    GenerationFailure(String),

    /// State machine misuse. Never retried automatically.
    #[error("Cannot {action} attempt {attempt_id} while it is {status}")]
    InvalidTransition {
        attempt_id: i64,
        status: AttemptStatus,
        action: &'static str,
    },

    /// Malformed exam/question data. Blocks persistence of that exam.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::ParseFailure { .. } => "PARSE_FAILURE",
            AppError::GenerationFailure(_) => "GENERATION_FAILURE",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::Persistence(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Access denied".to_string()),
            AppError::ParseFailure { file_ref, reason } => {
                tracing::warn!("Resume parse failed for {file_ref}: {reason}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Could not process resume, please retry".to_string(),
                )
            }
            AppError::GenerationFailure(reason) => {
                tracing::error!("Exam generation failed: {reason}");
                (StatusCode::BAD_GATEWAY, reason.clone())
            }
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvariantViolation(msg) => {
                tracing::error!("Invariant violation: {msg}");
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::StorageUnavailable(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Document storage is unavailable".to_string(),
                )
            }
            AppError::Persistence(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
