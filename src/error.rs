//! Error taxonomy surfaced to HTTP clients.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    InvalidInput(String),

    /// Unique constraint violation; carries the conflicting field name.
    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    /// Signin failure. Deliberately does not say which part was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    TokenExpired(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::Unauthenticated(_)
            | AppError::TokenExpired(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

/// Body rejections become `InvalidInput` without echoing serde detail.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "request body rejected");
        let message = match rejection {
            JsonRejection::JsonDataError(_) => "Invalid request data format",
            JsonRejection::JsonSyntaxError(_) => "Invalid JSON syntax in request body",
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`"
            }
            _ => "Invalid request body",
        };
        AppError::InvalidInput(message.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Parses a path or body id, reporting `message` as `InvalidInput` on failure.
pub fn parse_id(raw: &str, message: &'static str) -> AppResult<uuid::Uuid> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_hides_cause() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused at 10.0.0.3"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn already_exists_names_field() {
        let err = AppError::AlreadyExists("email");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "email already exists");
    }

    #[test]
    fn parse_id_reports_message() {
        let err = parse_id("not-a-uuid", "Invalid user ID").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(m) if m == "Invalid user ID"));
        assert!(parse_id(&uuid::Uuid::new_v4().to_string(), "x").is_ok());
    }

    #[test]
    fn token_failures_map_to_distinct_statuses() {
        assert_eq!(AppError::TokenExpired("Token expired").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("Invalid token").status(), StatusCode::FORBIDDEN);
    }
}
