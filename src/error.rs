use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::orchestrator::GenerationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("A generation is already in progress")]
    Busy,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Generation(GenerationError::Validation(_)) => StatusCode::BAD_REQUEST,
            AppError::Busy => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Generation(GenerationError::ImageSynthesis(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Generation(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("❌ {}", self);
        }
        let message = match &self {
            // Generic wording for the UI; details stay in the log.
            AppError::Generation(GenerationError::MalformedResponse(_)) => {
                "Image generation failed: the model returned an unreadable response. Please try again.".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
