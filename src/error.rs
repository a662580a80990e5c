use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// State conflicts: double payment, already cancelled, occupied table,
    /// inactive session. The operation aborts with no side effects.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Discovered mid-settlement; the whole transaction rolls back.
    #[error("No recipe for {0}")]
    MissingRecipe(String),
    /// Discovered mid-settlement; the whole transaction rolls back.
    #[error("Not enough stock for {0}")]
    InsufficientStock(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::engine::ResolveError> for AppError {
    fn from(err: crate::engine::ResolveError) -> Self {
        match err {
            crate::engine::ResolveError::MissingRecipe(name) => AppError::MissingRecipe(name),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::MissingRecipe(name) => {
                (StatusCode::CONFLICT, format!("No recipe for {}", name))
            }
            AppError::InsufficientStock(name) => (
                StatusCode::CONFLICT,
                format!("Not enough stock for {}", name),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
