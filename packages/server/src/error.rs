use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use serde::Serialize;

use crate::services::PatientError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `NOT_FOUND`, `METHOD_NOT_ALLOWED`,
    /// `UPLOAD_FAILED`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "name is required")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    NotFound(String),
    /// Contains the value of the `Allow` header.
    MethodNotAllowed(&'static str),
    UploadFailed(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid username or password".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::MethodNotAllowed(allowed) => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorBody {
                    code: "METHOD_NOT_ALLOWED",
                    message: format!("Method not allowed. Allowed: {allowed}"),
                },
            ),
            AppError::UploadFailed(detail) => {
                tracing::error!("Image upload failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "UPLOAD_FAILED",
                        message: "Failed to upload image".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let allow = if let AppError::MethodNotAllowed(allowed) = &self {
            Some(*allowed)
        } else {
            None
        };

        let (status, body) = self.status_and_body();

        if let Some(allowed) = allow {
            (status, [(header::ALLOW, allowed)], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::Validation { message, .. } => AppError::Validation(message),
            PatientError::NotFound(_) => AppError::NotFound("Patient record not found".into()),
            PatientError::Upload(e) => AppError::UploadFailed(e.to_string()),
            PatientError::Store(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidName(_) => {
                AppError::NotFound("Image not found".into())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
