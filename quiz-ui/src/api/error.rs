//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quiz_common::{SubmitError, ValidationFailure};
use serde_json::json;

/// Errors returned by quiz handlers
#[derive(Debug)]
pub enum ApiError {
    /// Required fields unmet (422)
    Validation(ValidationFailure),
    /// Submission already running or finished (409)
    AlreadySubmitting,
    /// Malformed request or out-of-range step (400)
    BadRequest(String),
    /// Nothing stored yet (404)
    NotFound(String),
}

impl From<quiz_common::Error> for ApiError {
    fn from(e: quiz_common::Error) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        ApiError::Validation(failure)
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Validation(failure) => ApiError::Validation(failure),
            SubmitError::AlreadySubmitting => ApiError::AlreadySubmitting,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(failure) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": failure.to_string(),
                    "message": failure.message(),
                    "step": failure.step,
                    "fields": failure.fields,
                }),
            ),
            ApiError::AlreadySubmitting => (
                StatusCode::CONFLICT,
                json!({ "error": SubmitError::AlreadySubmitting.to_string() }),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
        };

        (status, Json(body)).into_response()
    }
}
