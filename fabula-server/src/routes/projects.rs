//! Project CRUD (spec §6 non-streaming endpoints).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use fabula_core::model::Project;
use fabula_core::OrchestratorError;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::tenant_id::TenantId;

use super::acquire;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub user_id: String,
    pub title: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let project = Project::new(uuid::Uuid::new_v4().to_string(), req.user_id, req.title);
    handle.store.create_project(project.clone()).await?;
    Ok(Json(project))
}

#[derive(Deserialize)]
pub struct ListProjectsQuery {
    pub user_id: String,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Query(q): Query<ListProjectsQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let projects = handle.store.list_projects(&q.user_id).await?;
    Ok(Json(projects))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let project = handle
        .store
        .get_project(&id)
        .await?
        .ok_or_else(|| ApiError(OrchestratorError::NotFound(format!("project {id}"))))?;
    Ok(Json(project))
}
