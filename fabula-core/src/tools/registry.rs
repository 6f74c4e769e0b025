//! In-process tool registry: a name-keyed map of `dyn Tool`, itself a `ToolSource`.
//!
//! One `ToolRegistry` per tenant. Native tools (if any) are registered once at
//! startup; MCP-backed tools are registered/unregistered as `ToolPlugin` rows are
//! loaded/unloaded (C4 `load`/`unload`). Dispatch (`call_tool`) wraps every call
//! with the registered plugin's timeout and retry/backoff schedule and tracks the
//! counters `health()` uses to flag a degraded plugin (§4.4).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::model::{ToolPlugin, ToolTransport};
use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSource, ToolSourceError, ToolSpec};
use crate::tools::Tool;

#[derive(Clone, Debug, Default)]
struct ToolMetrics {
    total_calls: u64,
    success_calls: u64,
    failure_calls: u64,
    total_duration: Duration,
}

impl ToolMetrics {
    fn record(&mut self, success: bool, duration: Duration) {
        self.total_calls += 1;
        if success {
            self.success_calls += 1;
        } else {
            self.failure_calls += 1;
        }
        self.total_duration += duration;
    }

    fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.failure_calls as f64 / self.total_calls as f64
        }
    }

    fn avg_duration(&self) -> Duration {
        if self.total_calls == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.total_calls as u32
        }
    }
}

/// Health verdict for one registered tool (§4.4 `health()`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolHealthStatus {
    Healthy,
    Warning,
    Degraded,
}

/// Point-in-time health/metrics snapshot for one registered tool.
#[derive(Clone, Debug, Serialize)]
pub struct ToolHealth {
    pub name: String,
    pub total_calls: u64,
    pub success_calls: u64,
    pub failure_calls: u64,
    pub avg_duration_ms: u128,
    pub status: ToolHealthStatus,
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    plugin: ToolPlugin,
    metrics: ToolMetrics,
}

/// Thread-safe registry of tools, keyed by name. Implements `ToolSource` so it can
/// be handed to anything that dispatches calls purely by name and JSON arguments.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under the conservative defaults from `ToolPlugin::new`,
    /// replacing any existing tool with the same name. Use
    /// [`Self::register_with_plugin`] when a tenant's actual `ToolPlugin` row
    /// (and its timeout/retry knobs) is available.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let plugin = ToolPlugin::new(name.clone(), "", name.clone(), ToolTransport::Stdio { command: String::new(), args: Vec::new() });
        self.register_with_plugin(tool, plugin).await;
    }

    /// Registers a tool together with the `ToolPlugin` row governing its
    /// timeout/retry/health knobs (C4 `load`).
    pub async fn register_with_plugin(&self, tool: Arc<dyn Tool>, plugin: ToolPlugin) {
        let name = tool.name().to_string();
        self.tools.write().await.insert(name, RegisteredTool { tool, plugin, metrics: ToolMetrics::default() });
    }

    /// Removes a tool by name. Returns `true` if it was present.
    pub async fn unregister(&self, name: &str) -> bool {
        self.tools.write().await.remove(name).is_some()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// §4.4 `health()`: once a tool has taken at least `MIN_REQUESTS_FOR_HEALTH_CHECK`
    /// calls, a failure rate past `ERROR_RATE_WARNING` reports `Warning` and past
    /// `ERROR_RATE_CRITICAL` reports `Degraded`. Dispatch still attempts degraded
    /// tools; callers (e.g. an orchestrator's tool pre-pass) may elect to bypass them.
    pub async fn health(&self) -> Vec<ToolHealth> {
        self.tools
            .read()
            .await
            .iter()
            .map(|(name, entry)| {
                let rate = entry.metrics.failure_rate();
                let status = if entry.metrics.total_calls < ToolPlugin::MIN_REQUESTS_FOR_HEALTH_CHECK as u64 {
                    ToolHealthStatus::Healthy
                } else if rate > ToolPlugin::ERROR_RATE_CRITICAL {
                    ToolHealthStatus::Degraded
                } else if rate > ToolPlugin::ERROR_RATE_WARNING {
                    ToolHealthStatus::Warning
                } else {
                    ToolHealthStatus::Healthy
                };
                ToolHealth {
                    name: name.clone(),
                    total_calls: entry.metrics.total_calls,
                    success_calls: entry.metrics.success_calls,
                    failure_calls: entry.metrics.failure_calls,
                    avg_duration_ms: entry.metrics.avg_duration().as_millis(),
                    status,
                }
            })
            .collect()
    }

    async fn record(&self, name: &str, success: bool, duration: Duration) {
        if let Some(entry) = self.tools.write().await.get_mut(name) {
            entry.metrics.record(success, duration);
        }
    }
}

#[async_trait]
impl ToolSource for ToolRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.tools.read().await.values().map(|entry| entry.tool.spec()).collect())
    }

    /// §4.4 `call()`: times out and retries an individual call up to the
    /// registered plugin's `max_retries`, backing off exponentially between
    /// `base_retry_delay` and `max_retry_delay`, recording the counters `health()`
    /// reads. On repeated failure surfaces `ToolUnavailable` with the last error.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallContent, ToolSourceError> {
        let (tool, timeout, max_retries, base_delay, max_delay) = {
            let tools = self.tools.read().await;
            let entry = tools.get(name).ok_or_else(|| ToolSourceError::UnknownTool(name.to_string()))?;
            (Arc::clone(&entry.tool), entry.plugin.call_timeout, entry.plugin.max_retries, entry.plugin.base_retry_delay, entry.plugin.max_retry_delay)
        };

        let mut last_err = String::new();
        for attempt in 0..=max_retries {
            let started = Instant::now();
            let outcome = tokio::time::timeout(timeout, tool.call(arguments.clone(), None::<&ToolCallContext>)).await;
            let elapsed = started.elapsed();
            match outcome {
                Ok(Ok(content)) => {
                    self.record(name, true, elapsed).await;
                    return Ok(content);
                }
                Ok(Err(e)) => {
                    self.record(name, false, elapsed).await;
                    last_err = e.to_string();
                }
                Err(_) => {
                    self.record(name, false, elapsed).await;
                    last_err = format!("timed out after {:.1}s", timeout.as_secs_f64());
                }
            }
            if attempt < max_retries {
                let multiplier = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
                let backoff = base_delay.checked_mul(multiplier).unwrap_or(max_delay).min(max_delay);
                tokio::time::sleep(backoff).await;
            }
        }
        Err(ToolSourceError::ToolUnavailable(last_err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "echo".into(),
                description: Some("echoes input".into()),
                input_schema: serde_json::json!({}),
            }
        }
        async fn call(&self, args: Value, _ctx: Option<&ToolCallContext>) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent { text: args.to_string() })
        }
    }

    struct FlakyTool {
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl Tool for FlakyTool {
        fn name(&self) -> &str {
            "flaky"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec { name: "flaky".into(), description: None, input_schema: serde_json::json!({}) }
        }
        async fn call(&self, _args: Value, _ctx: Option<&ToolCallContext>) -> Result<ToolCallContent, ToolSourceError> {
            if self.failures_remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None }).is_ok() {
                Err(ToolSourceError::Transport("temporarily down".into()))
            } else {
                Ok(ToolCallContent { text: "recovered".into() })
            }
        }
    }

    struct AlwaysFailsTool;

    #[async_trait]
    impl Tool for AlwaysFailsTool {
        fn name(&self) -> &str {
            "always_fails"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec { name: "always_fails".into(), description: None, input_schema: serde_json::json!({}) }
        }
        async fn call(&self, _args: Value, _ctx: Option<&ToolCallContext>) -> Result<ToolCallContent, ToolSourceError> {
            Err(ToolSourceError::Transport("down".into()))
        }
    }

    fn fast_retry_plugin(name: &str) -> ToolPlugin {
        let mut plugin = ToolPlugin::new(name, "tenant-a", name, ToolTransport::Stdio { command: "x".into(), args: vec![] });
        plugin.base_retry_delay = Duration::from_millis(1);
        plugin.max_retry_delay = Duration::from_millis(2);
        plugin.call_timeout = Duration::from_millis(200);
        plugin
    }

    #[tokio::test]
    async fn register_list_and_call() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).await;

        let specs = registry.list_tools().await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");

        let result = registry.call_tool("echo", serde_json::json!({"a":1})).await.unwrap();
        assert_eq!(result.text, r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn call_unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry.call_tool("missing", serde_json::json!({})).await;
        assert!(matches!(err, Err(ToolSourceError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn unregister_removes_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).await;
        assert!(registry.unregister("echo").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn call_retries_until_success_within_max_retries() {
        let registry = ToolRegistry::new();
        let mut plugin = fast_retry_plugin("flaky");
        plugin.max_retries = 3;
        registry.register_with_plugin(Arc::new(FlakyTool { failures_remaining: AtomicU32::new(2) }), plugin).await;

        let result = registry.call_tool("flaky", serde_json::json!({})).await.unwrap();
        assert_eq!(result.text, "recovered");

        let health = registry.health().await;
        assert_eq!(health[0].total_calls, 3);
        assert_eq!(health[0].success_calls, 1);
        assert_eq!(health[0].failure_calls, 2);
    }

    #[tokio::test]
    async fn call_surfaces_tool_unavailable_after_exhausting_retries() {
        let registry = ToolRegistry::new();
        let mut plugin = fast_retry_plugin("always_fails");
        plugin.max_retries = 2;
        registry.register_with_plugin(Arc::new(AlwaysFailsTool), plugin).await;

        let err = registry.call_tool("always_fails", serde_json::json!({})).await;
        assert!(matches!(err, Err(ToolSourceError::ToolUnavailable(_))));

        let health = registry.health().await;
        assert_eq!(health[0].total_calls, 3);
        assert_eq!(health[0].failure_calls, 3);
    }

    #[tokio::test]
    async fn health_flags_degraded_once_failure_rate_and_volume_cross_thresholds() {
        let registry = ToolRegistry::new();
        let mut plugin = fast_retry_plugin("always_fails");
        plugin.max_retries = 0;
        registry.register_with_plugin(Arc::new(AlwaysFailsTool), plugin).await;

        for _ in 0..(ToolPlugin::MIN_REQUESTS_FOR_HEALTH_CHECK as usize + 1) {
            let _ = registry.call_tool("always_fails", serde_json::json!({})).await;
        }

        let health = registry.health().await;
        assert_eq!(health[0].status, ToolHealthStatus::Degraded);
    }

    #[tokio::test]
    async fn health_is_healthy_below_the_request_volume_floor() {
        let registry = ToolRegistry::new();
        let mut plugin = fast_retry_plugin("always_fails");
        plugin.max_retries = 0;
        registry.register_with_plugin(Arc::new(AlwaysFailsTool), plugin).await;

        let _ = registry.call_tool("always_fails", serde_json::json!({})).await;

        let health = registry.health().await;
        assert_eq!(health[0].status, ToolHealthStatus::Healthy);
    }
}
