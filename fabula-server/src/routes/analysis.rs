//! Analysis task status and chapter analysis lookup (C9, spec §4.8.4, §6).
//!
//! Status queries apply the same auto-recovery rule the orchestrator itself uses,
//! so a task stuck `running`/`queued` past its timeout is reported `failed` here
//! even if nothing ever drove the orchestrator to notice.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use fabula_core::model::{now_millis, AnalysisTask, ChapterAnalysis};
use fabula_core::orchestrators::apply_auto_recovery;
use fabula_core::OrchestratorError;

use crate::app::AppState;
use crate::error::ApiError;
use crate::tenant_id::TenantId;

use super::acquire;

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path((_project_id, task_id)): Path<(String, String)>,
) -> Result<Json<AnalysisTask>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let mut task = handle
        .store
        .get_analysis_task(&task_id)
        .await?
        .ok_or_else(|| ApiError(OrchestratorError::NotFound(format!("analysis task {task_id}"))))?;

    if apply_auto_recovery(&mut task, now_millis()) {
        handle.store.update_analysis_task(task.clone()).await?;
    }
    Ok(Json(task))
}

pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path((_project_id, chapter_id)): Path<(String, String)>,
) -> Result<Json<ChapterAnalysis>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let analysis = handle
        .store
        .get_chapter_analysis(&chapter_id)
        .await?
        .ok_or_else(|| ApiError(OrchestratorError::NotFound(format!("analysis for chapter {chapter_id}"))))?;
    Ok(Json(analysis))
}
