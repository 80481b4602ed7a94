use serde_json::json;
use std::fmt::Display;

use anyhow::Error as anyhowError;
use axum::{http::StatusCode, response::IntoResponse};

#[derive(Debug)]
pub enum AppError {
    // 400 bad request: malformed or duplicate input
    BadRequest(anyhowError),
    // 401 unauthorized: bad credentials or missing session
    Unauthorized(anyhowError),
    // 403 forbidden
    Forbidden(anyhowError),
    // 404 not found
    NotFound(anyhowError),
    // 500 internal server error
    InternalServerError(anyhowError),
}

impl AppError {
    /// Log a storage failure and hide its details behind `context`.
    pub fn database(err: sqlx::Error, context: &'static str) -> Self {
        tracing::error!(error = %err, "{}", context);
        AppError::InternalServerError(anyhowError::msg(context))
    }

    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .map(|db_err| db_err.is_unique_violation())
            .unwrap_or(false)
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(e) => write!(f, "BadRequest: {}", e),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::Forbidden(e) => write!(f, "Forbidden: {}", e),
            AppError::NotFound(e) => write!(f, "NotFound: {}", e),
            AppError::InternalServerError(e) => write!(f, "InternalServerError: {}", e),
        }
    }
}

impl From<anyhowError> for AppError {
    fn from(e: anyhowError) -> Self {
        AppError::InternalServerError(e)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::database(e, "Database error")
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        tracing::error!(error = %e, "Session store error");
        AppError::InternalServerError(anyhowError::msg("Session error"))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut error_messages = String::new();
        for (field, errors) in e.field_errors() {
            for error in errors {
                error_messages.push_str(&format!(
                    "{}: {} ",
                    field,
                    error
                        .message
                        .as_ref()
                        .map_or("invalid value", |m| m.as_ref())
                ));
            }
        }
        AppError::BadRequest(anyhowError::msg(error_messages.trim().to_string()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match &self {
            Self::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            Self::Forbidden(err) => (StatusCode::FORBIDDEN, err.to_string()),
            Self::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::InternalServerError(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        #[cfg(debug_assertions)]
        let error_response = json!({
            "error": {
                "message": error_message,
                "type": format!("{:?}", self),
            }
        });

        #[cfg(not(debug_assertions))]
        let error_response = json!({
            "error": {
                "message": if status.is_server_error() {
                    status.canonical_reason().unwrap_or("An error occurred").to_string()
                } else {
                    error_message
                },
            }
        });
        (status, axum::Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
