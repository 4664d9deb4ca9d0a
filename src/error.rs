// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Business rule that rejected a request.
///
/// Every variant is recoverable by the caller adjusting the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    /// The post owner tried to rate their own post.
    SelfRating,
    /// The post is no longer live.
    Expired,
    /// The user already rated this post.
    DuplicateRating,
    /// A topic id outside the fixed catalog.
    InvalidTopic,
    /// A post was submitted without any topic.
    MissingTopic,
    /// The requested expiry is not after the creation time.
    PastExpiry,
}

impl ValidationReason {
    /// Stable machine-readable code, exposed as `reason` in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationReason::SelfRating => "self-rating",
            ValidationReason::Expired => "expired",
            ValidationReason::DuplicateRating => "duplicate-rating",
            ValidationReason::InvalidTopic => "invalid-topic",
            ValidationReason::MissingTopic => "missing-topic",
            ValidationReason::PastExpiry => "past-expiry",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ValidationReason::SelfRating => "A person cannot rate their own post.",
            ValidationReason::Expired => "Cannot engage with an expired post.",
            ValidationReason::DuplicateRating => "User has already rated this post.",
            ValidationReason::InvalidTopic => "Unknown topic.",
            ValidationReason::MissingTopic => "A post needs at least one topic.",
            ValidationReason::PastExpiry => "Expiry date must be in the future.",
        }
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (malformed or out-of-range fields)
    BadRequest(String),

    // 400 Bad Request (business rule violation)
    Validation(ValidationReason),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),
}

impl AppError {
    /// The rule that was violated, if this is a business rule rejection.
    pub fn reason(&self) -> Option<ValidationReason> {
        match self {
            AppError::Validation(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "bad request: {}", msg),
            AppError::Validation(reason) => write!(f, "validation failed: {}", reason.code()),
            AppError::AuthError(msg) => write!(f, "unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "conflict: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": reason.message(), "reason": reason.code() }),
            ),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
