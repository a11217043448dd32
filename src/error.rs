use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Application-level error, mapped onto the response envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Io(e) => {
                error!(error = %e, "filesystem error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_their_status_codes() {
        assert_eq!(
            AppError::bad_request("bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::unauthorized("no").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::forbidden("nope").into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::not_found("gone").into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn infrastructure_errors_map_to_500() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(
            io.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let db = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(
            db.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let other = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(
            other.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
