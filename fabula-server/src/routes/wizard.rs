//! The three streaming wizard stages plus non-streaming cleanup (spec §4.8.3, §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use fabula_core::orchestrators::{
    run_wizard_characters, run_wizard_cleanup, run_wizard_outline, run_wizard_world,
    WizardCharactersRequest, WizardOutlineRequest, WizardWorldRequest,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::sse::stream_orchestrator;
use crate::tenant_id::TenantId;

#[derive(Deserialize)]
pub struct WorldBuildingRequest {
    pub user_id: String,
    pub title: String,
    pub theme: Option<String>,
    pub genre: Option<String>,
}

pub async fn world_building(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Json(req): Json<WorldBuildingRequest>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let ctx = state.ctx.clone();
    let session_id = format!("wizard-world-{}", Uuid::new_v4());
    stream_orchestrator(session_id, move |emitter| async move {
        let request = WizardWorldRequest {
            tenant_id,
            user_id: req.user_id,
            title: req.title,
            theme: req.theme,
            genre: req.genre,
        };
        run_wizard_world(&ctx, request, &emitter).await
    })
}

#[derive(Deserialize)]
pub struct CharactersRequest {
    pub project_id: String,
    pub count: u32,
}

pub async fn characters(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Json(req): Json<CharactersRequest>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let ctx = state.ctx.clone();
    let session_id = format!("wizard-characters-{}", Uuid::new_v4());
    stream_orchestrator(session_id, move |emitter| async move {
        let request = WizardCharactersRequest {
            tenant_id,
            project_id: req.project_id,
            count: req.count,
        };
        run_wizard_characters(&ctx, request, &emitter).await
    })
}

#[derive(Deserialize)]
pub struct OutlineRequest {
    pub project_id: String,
}

pub async fn outline(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Json(req): Json<OutlineRequest>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let ctx = state.ctx.clone();
    let session_id = format!("wizard-outline-{}", Uuid::new_v4());
    stream_orchestrator(session_id, move |emitter| async move {
        let request = WizardOutlineRequest {
            tenant_id,
            project_id: req.project_id,
        };
        run_wizard_outline(&ctx, request, &emitter).await
    })
}

/// `POST wizard-stream/cleanup/{project_id}`. Named like the streaming endpoints
/// but the underlying orchestrator (`run_wizard_cleanup`) is a single request/response
/// call, not a stream, so this returns plain JSON rather than SSE.
pub async fn cleanup(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = run_wizard_cleanup(&state.ctx, &tenant_id, &project_id).await?;
    Ok(Json(result))
}
