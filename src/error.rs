// =============================================================================
// ERROR MODULE
// =============================================================================
// This module defines custom error types and their HTTP responses.
//
// LEARNING NOTES:
// - Rust doesn't have exceptions; it uses Result<T, E> for error handling
// - thiserror crate makes defining error types easy
// - We convert our errors to HTTP responses using Axum's IntoResponse
//
// The analytics fold itself never fails; errors here come from reading the
// request, the database, or the cache.
// =============================================================================

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis operation failed
    #[error("Cache error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request body could not be read as the expected JSON shape
    #[error("Malformed body: {0}")]
    MalformedBody(#[from] JsonRejection),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            // 404 Not Found: Resource doesn't exist
            AppError::NotFound(msg) => ErrorResponse::new("NOT_FOUND", msg.clone()),

            // 400 Bad Request: Client sent invalid data
            AppError::BadRequest(msg) => ErrorResponse::new("BAD_REQUEST", msg.clone()),

            // Missing arrays, wrong types, invalid JSON all answer 400,
            // whatever status axum would have picked for the rejection
            AppError::MalformedBody(rejection) => ErrorResponse::with_details(
                "BAD_REQUEST",
                "Request body is missing a required field or is malformed",
                rejection.body_text(),
            ),

            // 500 Internal Server Error: don't expose internal details
            AppError::Database(_) => {
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }

            AppError::Redis(_) => ErrorResponse::new("CACHE_ERROR", "A cache error occurred"),

            AppError::Internal(msg) => ErrorResponse::new("INTERNAL_ERROR", msg.clone()),
        };

        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(
                error_code = %body.error,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::warn!(
                error_code = %body.error,
                message = %body.message,
                "Request rejected"
            );
        }

        (status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// CONVERSION HELPERS
// =============================================================================
// The database layer returns anyhow errors with context attached; a sqlx
// error underneath still maps to DATABASE_ERROR so its details stay private.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<sqlx::Error>() {
            Ok(db_err) => AppError::Database(db_err),
            Err(err) => AppError::Internal(format!("{:#}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("inv_1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BadRequest("delta".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_sqlx_errors_behind_context_stay_database_errors() {
        use anyhow::Context;

        let err = Err::<(), _>(sqlx::Error::RowNotFound)
            .context("Failed to fetch orders")
            .unwrap_err();

        assert!(matches!(AppError::from(err), AppError::Database(_)));
    }
}
