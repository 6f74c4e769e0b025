//! Tool registry and dispatch (C4): sources that expose a list of callable tools and
//! execute calls against them. `McpToolSource` is the only production implementation;
//! `Tool`/`ToolSource` are kept distinct so local/native tools and MCP-exposed tools can
//! sit behind the same registry (see [`crate::tools`]).

mod context;
pub mod mcp;

pub use context::ToolCallContext;
pub use mcp::McpToolSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Description of one callable tool, as returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Result of a successful tool call. MCP tools return text content blocks; this is
/// their concatenation (or, if empty, the tool's `structuredContent` serialized).
#[derive(Debug, Clone)]
pub struct ToolCallContent {
    pub text: String,
}

/// Errors from listing or calling tools through a `ToolSource`.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error: {0}")]
    JsonRpc(String),
    #[error("tool call timed out after {0:.1}s")]
    Timeout(f64),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool unavailable after retries: {0}")]
    ToolUnavailable(String),
}

/// A source of callable tools: lists specs and dispatches calls by name.
///
/// One tenant's `ToolPlugin` rows each back one `ToolSource` instance, registered
/// into the tenant's tool registry at startup or on-demand via `load`/`unload`.
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError>;
}
