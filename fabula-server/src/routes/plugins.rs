//! Tenant-scoped tool plugin registration (C4 Tool Registry, spec §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use fabula_core::model::{ToolPlugin, ToolTransport};
use fabula_core::tool_source::McpToolSource;
use fabula_core::tools::{register_mcp_tools, ToolHealth};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

use super::acquire;

#[derive(Deserialize)]
pub struct CreatePluginRequest {
    pub name: String,
    pub transport: ToolTransport,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
    Json(req): Json<CreatePluginRequest>,
) -> Result<Json<ToolPlugin>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let plugin = ToolPlugin::new(uuid::Uuid::new_v4().to_string(), &tenant_id, req.name, req.transport);
    handle.store.create_tool_plugin(plugin.clone()).await?;

    if plugin.enabled {
        load_plugin_tools(&state, &plugin).await;
    }

    Ok(Json(plugin))
}

/// Spawns/connects the plugin's MCP server and registers its tools into the
/// process-wide tool registry (§4.4). Best-effort: a plugin a tenant can't
/// currently reach shouldn't block its own registration, so failures are logged
/// and the plugin row stands as configured-but-unloaded.
async fn load_plugin_tools(state: &AppState, plugin: &ToolPlugin) {
    let Some(tools) = state.ctx.tools.as_ref() else {
        return;
    };

    let source = match &plugin.transport {
        ToolTransport::Stdio { command, args } => {
            McpToolSource::new(command.clone(), args.clone(), false).map_err(|e| e.to_string())
        }
        ToolTransport::Http { base_url } => {
            McpToolSource::new_http(base_url.clone(), std::iter::empty::<(String, String)>())
                .await
                .map_err(|e| e.to_string())
        }
    };

    match source {
        Ok(source) => match register_mcp_tools(tools, Arc::new(source), plugin).await {
            Ok(names) => tracing::info!(plugin = %plugin.name, tools = ?names, "loaded MCP tool plugin"),
            Err(e) => tracing::warn!(plugin = %plugin.name, error = %e, "failed to list tools for plugin"),
        },
        Err(e) => tracing::warn!(plugin = %plugin.name, error = %e, "failed to connect to plugin"),
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<ToolPlugin>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let plugins = handle.store.list_tool_plugins(&tenant_id).await?;
    Ok(Json(plugins))
}

/// Health/metrics snapshot for every tool currently loaded into the process-wide
/// registry (§4.4). Empty when no tool registry was configured at startup.
pub async fn health(
    State(state): State<Arc<AppState>>,
    Path(_tenant_id): Path<String>,
) -> Json<Vec<ToolHealth>> {
    match state.ctx.tools.as_ref() {
        Some(tools) => Json(tools.health().await),
        None => Json(Vec::new()),
    }
}
