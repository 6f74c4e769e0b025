//! Tool abstraction (C4): a `Tool` is anything callable by name with JSON args;
//! `ToolRegistry` holds a tenant's currently-loaded tools; `McpToolAdapter` bridges
//! one MCP-exposed tool into that registry.

mod mcp_adapter;
mod registry;
mod r#trait;

pub use mcp_adapter::{register_mcp_tools, McpToolAdapter};
pub use r#trait::Tool;
pub use registry::{ToolHealth, ToolHealthStatus, ToolRegistry};
