//! Common error type and alias for the service.
//!
//! Handlers return `AppResult<T>`; the `IntoResponse` impl maps each variant
//! to the status code and JSON body shape the front-end expects
//! (`{"error": ...}` for forbidden/missing/server faults, `{"message": ...}`
//! for validation and conflict responses).
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed request input.
    #[error("{0}")]
    Validation(String),
    /// A resolved filesystem path escaped its sandbox root.
    #[error("Forbidden path")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    /// Target already exists (folder creation).
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    HttpClient(#[from] reqwest::Error),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "message": msg }))
            }
            AppError::Forbidden => {
                (StatusCode::FORBIDDEN, json!({ "error": "Forbidden path" }))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "message": msg })),
            other => {
                tracing::error!("request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": other.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
