use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a registered MCP tool source is reached.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolTransport {
    Stdio { command: String, args: Vec<String> },
    Http { base_url: String },
}

/// A tenant-scoped tool plugin registration (C4): which MCP server to talk to,
/// and the health/retry knobs that govern it. Defaults mirror a conservative
/// production MCP client: bounded client pool, idle reclamation, and a
/// circuit-breaker style error-rate cutoff.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolPlugin {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub transport: ToolTransport,
    pub enabled: bool,
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub call_timeout: Duration,
    pub tool_cache_ttl: Duration,
}

impl ToolPlugin {
    pub const MAX_CLIENTS: usize = 10;
    pub const CLIENT_TTL_SECONDS: u64 = 3600;
    pub const IDLE_TIMEOUT_SECONDS: u64 = 1800;
    pub const HEALTH_CHECK_INTERVAL_SECONDS: u64 = 30;
    pub const CLEANUP_INTERVAL_SECONDS: u64 = 300;
    pub const ERROR_RATE_CRITICAL: f64 = 0.7;
    pub const ERROR_RATE_WARNING: f64 = 0.4;
    pub const MIN_REQUESTS_FOR_HEALTH_CHECK: u32 = 10;

    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, name: impl Into<String>, transport: ToolTransport) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            transport,
            enabled: true,
            max_retries: 3,
            base_retry_delay: Duration::from_secs_f64(1.0),
            max_retry_delay: Duration::from_secs_f64(10.0),
            call_timeout: Duration::from_secs_f64(60.0),
            tool_cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_conservative_defaults() {
        let plugin = ToolPlugin::new(
            "p1",
            "tenant-a",
            "worldbuilder",
            ToolTransport::Stdio {
                command: "mcp-worldbuilder".to_string(),
                args: vec![],
            },
        );
        assert_eq!(plugin.max_retries, 3);
        assert_eq!(plugin.call_timeout, Duration::from_secs(60));
        assert!(plugin.enabled);
    }
}
