//! Chapter CRUD and the Chapter Generate streaming endpoint (spec §4.8.1, §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use fabula_core::model::Chapter;
use fabula_core::orchestrators::{run_chapter_generate, ChapterGenerateRequest};
use fabula_core::OrchestratorError;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::sse::stream_orchestrator;
use crate::tenant_id::TenantId;

use super::acquire;

#[derive(Deserialize)]
pub struct GenerateChapterRequest {
    pub project_id: String,
    pub outline_title: String,
    pub outline_summary: String,
    pub target_words: Option<u32>,
    #[serde(default)]
    pub enable_tools: bool,
}

/// `POST chapters/{chapter_number}/generate-stream`. The path segment is the chapter
/// number, not an id: a chapter row does not exist yet the first time this is called
/// for a given number.
pub async fn generate_stream(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(chapter_number): Path<u32>,
    Json(req): Json<GenerateChapterRequest>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let ctx = state.ctx.clone();
    let session_id = format!("chapter-generate-{}", Uuid::new_v4());
    stream_orchestrator(session_id, move |emitter| async move {
        let request = ChapterGenerateRequest {
            tenant_id,
            project_id: req.project_id,
            chapter_number,
            outline_title: req.outline_title,
            outline_summary: req.outline_summary,
            target_words: req.target_words,
            enable_tools: req.enable_tools,
        };
        run_chapter_generate(&ctx, request, &emitter).await
    })
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Chapter>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let chapters = handle.store.list_chapters(&project_id).await?;
    Ok(Json(chapters))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path((project_id, chapter_id)): Path<(String, String)>,
) -> Result<Json<Chapter>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let chapter = handle
        .store
        .get_chapter(&project_id, &chapter_id)
        .await?
        .ok_or_else(|| ApiError(OrchestratorError::NotFound(format!("chapter {chapter_id}"))))?;
    Ok(Json(chapter))
}
