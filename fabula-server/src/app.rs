//! Axum app: shared state and route table.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use fabula_core::OrchestratorContext;

use crate::routes;

/// Shared across every request: the orchestrator context (tenant registry, LLM
/// adapter, prompt composer, tool registry), cloned cheaply (everything inside is
/// an `Arc`).
pub struct AppState {
    pub ctx: OrchestratorContext,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/projects", post(routes::projects::create).get(routes::projects::list))
        .route("/projects/:id", get(routes::projects::get))
        .route(
            "/wizard-stream/world-building",
            post(routes::wizard::world_building),
        )
        .route("/wizard-stream/characters", post(routes::wizard::characters))
        .route("/wizard-stream/outline", post(routes::wizard::outline))
        .route("/wizard-stream/cleanup/:project_id", post(routes::wizard::cleanup))
        .route(
            "/outlines/generate-stream",
            post(routes::outlines::generate_stream),
        )
        .route("/projects/:project_id/outlines", get(routes::outlines::list))
        .route(
            "/projects/:project_id/outlines/reorder",
            put(routes::outlines::reorder),
        )
        .route(
            "/chapters/:id/generate-stream",
            post(routes::chapters::generate_stream),
        )
        .route("/projects/:project_id/chapters", get(routes::chapters::list))
        .route(
            "/projects/:project_id/chapters/:chapter_id",
            get(routes::chapters::get),
        )
        .route(
            "/projects/:project_id/entities",
            post(routes::entities::create).get(routes::entities::list),
        )
        .route(
            "/projects/:project_id/relationships",
            post(routes::entities::create_relationship).get(routes::entities::list_relationships),
        )
        .route(
            "/projects/:project_id/styles/default",
            put(routes::styles::set_default).get(routes::styles::get_default),
        )
        .route(
            "/tenants/:tenant_id/plugins",
            post(routes::plugins::create).get(routes::plugins::list),
        )
        .route("/tenants/:tenant_id/plugins/health", get(routes::plugins::health))
        .route(
            "/projects/:project_id/memory",
            get(routes::memory::list),
        )
        .route(
            "/projects/:project_id/memory/search",
            post(routes::memory::search),
        )
        .route(
            "/projects/:project_id/analysis-tasks/:task_id",
            get(routes::analysis::get_task),
        )
        .route(
            "/projects/:project_id/chapters/:chapter_id/analysis",
            get(routes::analysis::get_analysis),
        )
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
