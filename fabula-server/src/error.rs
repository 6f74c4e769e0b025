//! Maps [`OrchestratorError`] onto HTTP status codes for non-streaming routes.
//!
//! Streaming routes never go through this: a failure mid-stream becomes a terminal
//! `error` SSE event instead of an HTTP status (see [`crate::sse`]).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fabula_core::OrchestratorError;
use serde_json::json;

pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

impl From<fabula_core::StoreError> for ApiError {
    fn from(e: fabula_core::StoreError) -> Self {
        Self(e.into())
    }
}

/// Same taxonomy `error_code` uses for SSE `error` events (spec §7), so a client
/// sees the same `code` string whether the failure arrived as a stream event or
/// an HTTP response body.
pub fn error_code(err: &OrchestratorError) -> &'static str {
    match err {
        OrchestratorError::Validation(_) => "validation",
        OrchestratorError::NotFound(_) => "not_found",
        OrchestratorError::Conflict(_) => "conflict",
        OrchestratorError::LlmUnavailable(_) => "llm_unavailable",
        OrchestratorError::LlmTimeout(_) => "llm_timeout",
        OrchestratorError::LlmInvalidResponse(_) => "llm_invalid_response",
        OrchestratorError::ToolUnavailable(_) => "tool_unavailable",
        OrchestratorError::ParseError(_) => "parse_error",
        OrchestratorError::Cancelled => "cancelled",
        OrchestratorError::Internal(_) => "internal",
    }
}

fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::Validation(_) | OrchestratorError::ParseError(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::Conflict(_) => StatusCode::CONFLICT,
        OrchestratorError::Cancelled => StatusCode::BAD_REQUEST,
        OrchestratorError::LlmUnavailable(_)
        | OrchestratorError::LlmTimeout(_)
        | OrchestratorError::ToolUnavailable(_) => StatusCode::BAD_GATEWAY,
        OrchestratorError::LlmInvalidResponse(_) | OrchestratorError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = Json(json!({
            "error": self.0.to_string(),
            "code": error_code(&self.0),
        }));
        (status, body).into_response()
    }
}
