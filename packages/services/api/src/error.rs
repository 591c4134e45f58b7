//! API 에러 타입

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API 에러
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] bookstall_core::Error),

    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// 에러 응답 JSON
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(e) => {
                let status = StatusCode::from_u16(e.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, e.to_string())
            }
            // 스토어 실패는 재시도 없이 한 번만 보고한다
            ApiError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use bookstall_core::Error;

    #[test]
    fn test_core_error_statuses() {
        let resp = ApiError::Core(Error::Unauthenticated).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = ApiError::Core(Error::invalid_operation("book not purchased")).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::Core(Error::not_found("path not found")).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_database_error_is_bad_request() {
        let resp = ApiError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
