//! §7 error kinds, surfaced through axum as typed JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("storage failure: {0}")]
    StorageFailure(#[from] flagfarm_db::DbError),
    #[error("malformed request: {0}")]
    ClientMalformed(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("build missing: {0}")]
    BuildMissing(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::StorageFailure(err) => {
                tracing::error!(error = %err, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage failure".to_string())
            }
            AppError::ClientMalformed(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized".to_string()),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, what.clone()),
            AppError::BuildMissing(what) => (StatusCode::INTERNAL_SERVER_ERROR, what.clone()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
