//! Mapping from execution failures to HTTP responses.

use crate::types::ErrorBody;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snipbox_core::ExecError;
use std::time::Duration;

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body is not the expected JSON object.
    #[error("Invalid JSON format")]
    InvalidJson,

    /// Language is not registered.
    #[error("Language not supported")]
    NotSupported,

    /// Run exceeded the pipeline budget.
    #[error("Execution error: execution timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// Workspace, staging or spawn failure.
    #[error("Execution error: {0}")]
    Execution(ExecError),

    /// Debug shell command could not be started.
    #[error("Failed to start command: {0}")]
    Command(String),
}

impl From<ExecError> for ApiError {
    fn from(err: ExecError) -> Self {
        match err {
            ExecError::NotSupported(_) => Self::NotSupported,
            other => Self::Execution(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson | Self::NotSupported => StatusCode::BAD_REQUEST,
            Self::TimedOut(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Execution(_) | Self::Command(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
