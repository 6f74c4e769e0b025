//! Top-level error taxonomy for the orchestration engine.
//!
//! Every component (tenant store, LLM adapter, tool registry, orchestrators) returns
//! its own narrow error type; orchestrator-facing code converts into `OrchestratorError`
//! at the boundary so HTTP handlers and SSE emitters have one enum to match on.

use thiserror::Error;

use crate::cache::CacheError;
use crate::llm::LlmError;
use crate::memory::StoreError;
use crate::tool_source::ToolSourceError;

/// Errors surfaced by C8 orchestrators and anything calling into them.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Request failed schema or business-rule validation (e.g. wizard step out of order).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced entity (tenant, project, chapter, outline node, ...) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation conflicts with current state (e.g. regenerating a chapter mid-generation).
    #[error("conflict: {0}")]
    Conflict(String),

    /// LLM adapter could not reach the provider after exhausting retries.
    #[error("llm unavailable: {0}")]
    LlmUnavailable(String),

    /// LLM call exceeded its deadline.
    #[error("llm call timed out after {0:.1}s")]
    LlmTimeout(f64),

    /// LLM returned content that could not be parsed into the expected structured shape.
    #[error("llm returned invalid response: {0}")]
    LlmInvalidResponse(String),

    /// A tool/plugin dispatch failed or the plugin is unreachable.
    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Failed to parse stored or generated content (JSON, outline markdown, ...).
    #[error("parse error: {0}")]
    ParseError(String),

    /// The client disconnected or the run was cancelled before completion.
    #[error("cancelled")]
    Cancelled,

    /// Unexpected internal failure (storage I/O, serialization, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for OrchestratorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => OrchestratorError::NotFound(msg),
            other => OrchestratorError::Internal(other.to_string()),
        }
    }
}

impl From<ToolSourceError> for OrchestratorError {
    fn from(e: ToolSourceError) -> Self {
        OrchestratorError::ToolUnavailable(e.to_string())
    }
}

impl From<LlmError> for OrchestratorError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout(secs) => OrchestratorError::LlmTimeout(secs),
            LlmError::InvalidResponse(msg) => OrchestratorError::LlmInvalidResponse(msg),
            other => OrchestratorError::LlmUnavailable(other.to_string()),
        }
    }
}

impl From<CacheError> for OrchestratorError {
    fn from(e: CacheError) -> Self {
        OrchestratorError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        OrchestratorError::ParseError(e.to_string())
    }
}

impl From<rusqlite::Error> for OrchestratorError {
    fn from(e: rusqlite::Error) -> Self {
        OrchestratorError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err: OrchestratorError = StoreError::NotFound("project 7".into()).into();
        assert!(matches!(err, OrchestratorError::NotFound(_)));
    }

    #[test]
    fn llm_timeout_carries_seconds() {
        let err: OrchestratorError = LlmError::Timeout(60.0).into();
        match err {
            OrchestratorError::LlmTimeout(secs) => assert_eq!(secs, 60.0),
            _ => panic!("expected LlmTimeout"),
        }
    }
}
