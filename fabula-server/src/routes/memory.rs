//! Read access to a project's memory fragments (C3 Memory Service, spec §6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use fabula_core::model::{MemoryFragment, MemoryType, ScoredFragment};
use fabula_core::MemoryStore;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::tenant_id::TenantId;

use super::acquire;

#[derive(Deserialize)]
pub struct ListMemoryQuery {
    pub memory_type: Option<MemoryType>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
    Query(q): Query<ListMemoryQuery>,
) -> Result<Json<Vec<MemoryFragment>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let fragments = handle
        .memory
        .list(&project_id, q.memory_type, q.limit, q.offset)
        .await?;
    Ok(Json(fragments))
}

#[derive(Deserialize)]
pub struct SearchMemoryRequest {
    pub project_id: String,
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Json(req): Json<SearchMemoryRequest>,
) -> Result<Json<Vec<ScoredFragment>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let results = handle.memory.search(&req.project_id, &req.query, req.limit).await?;
    Ok(Json(results))
}
