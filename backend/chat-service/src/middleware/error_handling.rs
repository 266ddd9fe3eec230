use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Uniform JSON error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub code: String,
}

/// Map domain errors to HTTP responses.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match err {
        AppError::BadRequest(_) => "INVALID_REQUEST",
        AppError::Unauthorized => "UNAUTHORIZED",
        AppError::Forbidden => "FORBIDDEN",
        AppError::NotFound(_) => "NOT_FOUND",
        AppError::Database(_) => "DATABASE_ERROR",
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => "INTERNAL_ERROR",
    };

    let error = match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Error",
    };

    let response = ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status: status.as_u16(),
        code: code.to_string(),
    };

    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    if err.status_code() >= 500 {
        tracing::error!(error = %err, "request failed");
    }
    let (status, response) = map_error(&err);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_statuses() {
        let (status, body) = map_error(&AppError::NotFound("conversation"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "NOT_FOUND");
        assert_eq!(body.message, "conversation not found");

        let (status, body) = map_error(&AppError::BadRequest("content or quotation is required".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "INVALID_REQUEST");

        let (status, _) = map_error(&AppError::Unauthorized);
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = map_error(&AppError::Internal);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal Server Error");
    }
}
