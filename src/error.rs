use axum::Json;
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::ai::AiError;
use crate::validation::FieldError;

pub const AI_RATE_LIMIT_MESSAGE: &str = "AI service rate limit exceeded. Please try again later.";

#[derive(Debug)]
pub enum AppError {
    /// Body parsed but failed schema checks.
    Validation(Vec<FieldError>),
    /// Body or query could not be parsed at all.
    InvalidInput(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    RateLimited { retry_after_secs: u64 },
    UpstreamRateLimited,
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

#[derive(Serialize)]
struct ValidationResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl AppError {
    /// Maps a failed generation to 429 when the provider reports a rate limit,
    /// otherwise to a 500 carrying `context` as the client-facing message.
    pub fn from_ai(err: AiError, context: &str) -> Self {
        if err.is_rate_limited() {
            tracing::warn!("AI provider rate limited: {}", err);
            AppError::UpstreamRateLimited
        } else {
            tracing::error!("{}: {}", context, err);
            AppError::Internal(context.to_string())
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } | AppError::UpstreamRateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(errors) => (
                status,
                Json(ValidationResponse {
                    message: "Validation error",
                    errors,
                }),
            )
                .into_response(),
            AppError::InvalidInput(detail) => (
                status,
                Json(ValidationResponse {
                    message: "Invalid input",
                    errors: vec![FieldError::new("body", detail)],
                }),
            )
                .into_response(),
            AppError::RateLimited { retry_after_secs } => {
                let mut response = (
                    status,
                    Json(ErrorResponse {
                        error: "Too many requests",
                        message: format!("Please try again in {} seconds", retry_after_secs),
                        retry_after: Some(retry_after_secs),
                    }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            AppError::UpstreamRateLimited => (
                status,
                Json(ErrorResponse {
                    error: "Too many requests",
                    message: AI_RATE_LIMIT_MESSAGE.to_string(),
                    retry_after: None,
                }),
            )
                .into_response(),
            AppError::Unauthorized(message) => error_body(status, "Unauthorized", message),
            AppError::NotFound(message) => error_body(status, "Not found", message),
            AppError::Conflict(message) => error_body(status, "Conflict", message),
            AppError::Internal(message) => error_body(status, "Internal server error", message),
        }
    }
}

fn error_body(status: StatusCode, error: &'static str, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            message,
            retry_after: None,
        }),
    )
        .into_response()
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".into()),
            other => {
                tracing::error!("Database error: {:?}", other);
                AppError::Internal("Internal server error".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_rate_limit_maps_to_429() {
        let err = AiError::Provider {
            status: None,
            message: "Resource exhausted: rate limit exceeded for project".into(),
        };
        let app_err = AppError::from_ai(err, "Failed to get recommendations");
        assert_eq!(app_err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn other_provider_failures_map_to_500() {
        let err = AiError::Transport("connection reset by peer".into());
        let app_err = AppError::from_ai(err, "Failed to get travel tips");
        assert_eq!(app_err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match app_err {
            AppError::Internal(message) => assert_eq!(message, "Failed to get travel tips"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rate_limited_sets_retry_after_header() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn row_not_found_is_404() {
        let app_err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(app_err.status(), StatusCode::NOT_FOUND);
    }
}
