//! Project default writing style (spec §6, feeds C7 prompt composition).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use fabula_core::model::{ProjectDefaultStyle, WritingStyle};
use fabula_core::OrchestratorError;

use crate::app::AppState;
use crate::error::ApiError;
use crate::tenant_id::TenantId;

use super::acquire;

pub async fn set_default(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
    Json(style): Json<WritingStyle>,
) -> Result<Json<ProjectDefaultStyle>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let default_style = ProjectDefaultStyle::new(project_id, style);
    handle.store.set_project_default_style(default_style.clone()).await?;
    Ok(Json(default_style))
}

pub async fn get_default(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectDefaultStyle>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let default_style = handle
        .store
        .get_project_default_style(&project_id)
        .await?
        .ok_or_else(|| ApiError(OrchestratorError::NotFound(format!("default style for project {project_id}"))))?;
    Ok(Json(default_style))
}
