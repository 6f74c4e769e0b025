//! Outline CRUD and the Outline Continue streaming endpoint (spec §4.8.2, §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use fabula_core::model::OutlineNode;
use fabula_core::orchestrators::{run_outline_continue, OutlineContinueMode, OutlineContinueRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::sse::stream_orchestrator;
use crate::tenant_id::TenantId;

use super::acquire;

#[derive(Deserialize)]
pub struct GenerateOutlineRequest {
    pub project_id: String,
    pub total_chapters: u32,
    #[serde(default = "default_mode")]
    pub mode: OutlineContinueMode,
    pub plot_stage_hint: Option<String>,
    pub story_direction: Option<String>,
    #[serde(default)]
    pub enable_tools: bool,
}

fn default_mode() -> OutlineContinueMode {
    OutlineContinueMode::Auto
}

/// `POST outlines/generate-stream`.
pub async fn generate_stream(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Json(req): Json<GenerateOutlineRequest>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let ctx = state.ctx.clone();
    let session_id = format!("outline-continue-{}", Uuid::new_v4());
    stream_orchestrator(session_id, move |emitter| async move {
        let request = OutlineContinueRequest {
            tenant_id,
            project_id: req.project_id,
            total_chapters: req.total_chapters,
            mode: req.mode,
            plot_stage_hint: req.plot_stage_hint,
            story_direction: req.story_direction,
            enable_tools: req.enable_tools,
        };
        run_outline_continue(&ctx, request, &emitter).await
    })
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<OutlineNode>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let nodes = handle.store.list_outline_nodes(&project_id).await?;
    Ok(Json(nodes))
}

#[derive(Deserialize)]
pub struct ReorderOutlineRequest {
    /// Outline node ids in their new order; position in this list becomes the
    /// node's new 1-based `order_index`.
    pub ordered_ids: Vec<String>,
}

pub async fn reorder(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
    Json(req): Json<ReorderOutlineRequest>,
) -> Result<Json<Vec<OutlineNode>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let pairs = req
        .ordered_ids
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, i as i64 + 1))
        .collect();
    handle.store.reorder_outline_nodes(&project_id, pairs).await?;
    let nodes = handle.store.list_outline_nodes(&project_id).await?;
    Ok(Json(nodes))
}
