use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;

/// Unified application error type that maps to JSON HTTP responses.
///
/// Rendered as `{ "error": { "code": "...", "message": "..." } }`.
#[derive(Debug)]
pub enum AppError {
    /// 400 Bad Request
    BadRequest(String),
    /// 401 Unauthorized
    Unauthorized(String),
    /// 403 Forbidden
    Forbidden(String),
    /// 404 Not Found
    NotFound(String),
    /// 409 Conflict
    Conflict(String),
    /// 413 Payload Too Large
    PayloadTooLarge(String),
    /// 500 Internal Server Error (wraps any error, logs details, returns generic message)
    Internal(anyhow::Error),
}

impl AppError {
    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a unique-index violation to `Conflict(message)`; any other database
    /// error stays internal.
    #[must_use]
    pub fn conflict_on_duplicate(err: DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Self::Conflict(message.to_string()),
            _ => Self::Internal(err.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match self {
            Self::BadRequest(msg) => ("BAD_REQUEST".to_string(), msg),
            Self::Unauthorized(msg) => ("UNAUTHORIZED".to_string(), msg),
            Self::Forbidden(msg) => ("FORBIDDEN".to_string(), msg),
            Self::NotFound(msg) => ("NOT_FOUND".to_string(), msg),
            Self::Conflict(msg) => ("CONFLICT".to_string(), msg),
            Self::PayloadTooLarge(msg) => ("PAYLOAD_TOO_LARGE".to_string(), msg),
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    "INTERNAL_ERROR".to_string(),
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            })),
        )
            .into_response()
    }
}

/// Allow `?` to automatically convert any `anyhow::Error` into `AppError::Internal`.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::BadRequest(String::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict(String::new()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::PayloadTooLarge(String::new()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_non_unique_db_error_stays_internal() {
        let err = AppError::conflict_on_duplicate(
            sea_orm::DbErr::Custom("boom".to_string()),
            "already exists",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_db_error_becomes_internal() {
        let err: AppError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
