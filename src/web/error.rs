//! Request errors and their HTTP responses.

use crate::charts::RenderError;
use crate::stats::{AggregateError, MetricsError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Rendering failed: {0}")]
    RenderError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::RenderError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Rendering error: {msg}"),
            ),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        if status.is_server_error() {
            tracing::warn!(%status, "{}", error_message);
        } else {
            tracing::debug!(%status, "{}", error_message);
        }
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<AggregateError> for AppError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::PolarsError(e) => AppError::InternalServerError(e.to_string()),
            other => AppError::InvalidInput(other.to_string()),
        }
    }
}

impl From<MetricsError> for AppError {
    fn from(err: MetricsError) -> Self {
        match err {
            MetricsError::Aggregate(e) => e.into(),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::RenderError(err.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::InternalServerError(format!("Template error: {err}"))
    }
}
