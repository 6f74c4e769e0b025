//! MCP tool adapter: wraps each MCP tool as `dyn Tool` for a single registry.
//!
//! Each MCP tool is represented by an `McpToolAdapter` that implements `Tool`;
//! `call` delegates to the shared `McpToolSource`. Use `register_mcp_tools`
//! to list MCP tools and register one adapter per tool into a `ToolRegistry`.
//! This is how a tenant's `ToolPlugin` row becomes a set of callable tools (C4 `load`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::ToolPlugin;
use crate::tool_source::McpToolSource;
use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSource, ToolSourceError, ToolSpec};
use crate::tools::{Tool, ToolRegistry};

/// Adapter that makes one MCP tool implement the `Tool` trait.
pub struct McpToolAdapter {
    name: String,
    spec: ToolSpec,
    source: Arc<McpToolSource>,
}

impl McpToolAdapter {
    pub fn new(name: String, spec: ToolSpec, source: Arc<McpToolSource>) -> Self {
        Self { name, spec, source }
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.source.call_tool(self.name.as_str(), args).await
    }
}

/// Lists tools from the MCP server and registers one adapter per tool into `registry`,
/// under the timeout/retry/health knobs carried by `plugin` (C4 `load`). Returns the
/// tool names registered, so callers can record them against the `ToolPlugin` row
/// for later `unload`.
pub async fn register_mcp_tools(
    registry: &ToolRegistry,
    mcp: Arc<McpToolSource>,
    plugin: &ToolPlugin,
) -> Result<Vec<String>, ToolSourceError> {
    let specs = mcp.list_tools().await?;
    let mut names = Vec::with_capacity(specs.len());
    for spec in specs {
        let name = spec.name.clone();
        let adapter = McpToolAdapter::new(name.clone(), spec, Arc::clone(&mcp));
        let mut tool_plugin = plugin.clone();
        tool_plugin.name = name.clone();
        registry.register_with_plugin(Arc::new(adapter), tool_plugin).await;
        names.push(name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn read_http_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut tmp = [0u8; 1024];
        loop {
            let n = stream.read(&mut tmp).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let header_end = pos + 4;
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let content_length = headers
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                let mut body = buf[header_end..].to_vec();
                while body.len() < content_length {
                    let m = stream.read(&mut tmp).await.unwrap();
                    if m == 0 {
                        break;
                    }
                    body.extend_from_slice(&tmp[..m]);
                }
                return String::from_utf8_lossy(&body[..content_length]).to_string();
            }
        }
        String::new()
    }

    async fn write_http_response(
        stream: &mut TcpStream,
        status: &str,
        content_type: Option<&str>,
        body: &str,
    ) {
        let mut resp = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
        if let Some(ct) = content_type {
            resp.push_str(&format!("Content-Type: {}\r\n", ct));
        }
        resp.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
        stream.write_all(resp.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn register_mcp_tools_adds_adapters_and_can_call_registered_tool() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            for _ in 0..4 {
                let (mut stream, _) = listener.accept().await.unwrap();
                let body = read_http_request(&mut stream).await;
                let json: serde_json::Value =
                    serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
                let method = json.get("method").and_then(|m| m.as_str()).unwrap_or("");
                match method {
                    "initialize" => {
                        let body = serde_json::json!({
                            "jsonrpc":"2.0",
                            "id":"fabula-mcp-initialize",
                            "result":{"protocolVersion":"2025-11-25"}
                        })
                        .to_string();
                        write_http_response(&mut stream, "200 OK", Some("application/json"), &body)
                            .await;
                    }
                    "notifications/initialized" => {
                        write_http_response(&mut stream, "202 Accepted", None, "").await;
                    }
                    "tools/list" => {
                        let body = serde_json::json!({
                            "jsonrpc":"2.0",
                            "id":"fabula-tools-list",
                            "result":{"tools":[{"name":"demo_mcp","description":"demo tool","inputSchema":{"type":"object"}}]}
                        })
                        .to_string();
                        write_http_response(&mut stream, "200 OK", Some("application/json"), &body)
                            .await;
                    }
                    "tools/call" => {
                        let body = serde_json::json!({
                            "jsonrpc":"2.0",
                            "id":"fabula-call-demo_mcp",
                            "result":{"content":[{"type":"text","text":"adapter-ok"}]}
                        })
                        .to_string();
                        write_http_response(&mut stream, "200 OK", Some("application/json"), &body)
                            .await;
                    }
                    _ => panic!("unexpected method: {}", method),
                }
            }
        });

        let mcp = Arc::new(
            McpToolSource::new_http(
                format!("http://{}", addr),
                std::iter::empty::<(String, String)>(),
            )
            .await
            .unwrap(),
        );
        let registry = ToolRegistry::new();
        let plugin = ToolPlugin::new(
            "plugin-1",
            "tenant-a",
            "demo",
            crate::model::ToolTransport::Http { base_url: format!("http://{}", addr) },
        );
        register_mcp_tools(&registry, Arc::clone(&mcp), &plugin).await.unwrap();

        let tools = registry.list_tools().await.unwrap();
        assert!(tools.iter().any(|t| t.name == "demo_mcp"));

        let out = registry
            .call_tool("demo_mcp", serde_json::json!({"x":1}))
            .await
            .unwrap();
        assert_eq!(out.text, "adapter-ok");

        server.await.unwrap();
    }
}
