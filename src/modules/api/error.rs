use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::shared::errors::AppError;

/// Maps the store of `AppError` variants onto the error taxonomy of §7:
/// validation failures are client errors, resolution-impossible cases are
/// 404s, everything else unexpected surfaces as 500 with its message.
pub fn into_response(err: AppError) -> Response {
    let status = match &err {
        AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::RateLimitError(_) => StatusCode::TOO_MANY_REQUESTS,
        AppError::DatabaseError(_)
        | AppError::ApiError(_)
        | AppError::InternalError(_)
        | AppError::CacheError(_)
        | AppError::SerializationError(_)
        | AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(json!({
            "success": false,
            "error": error_code(&err),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

fn error_code(err: &AppError) -> &'static str {
    match err {
        AppError::ValidationError(_) | AppError::InvalidInput(_) => "Bad Request",
        AppError::Unauthorized(_) => "Unauthorized",
        AppError::NotFound(_) => "Not Found",
        AppError::RateLimitError(_) => "Too Many Requests",
        _ => "Internal Server Error",
    }
}

pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        into_response(self.0)
    }
}
