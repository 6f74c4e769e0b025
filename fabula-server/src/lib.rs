//! HTTP + SSE server for the fabula orchestration engine (spec §6).
//!
//! Listens on `127.0.0.1:8080` by default, exposing CRUD over projects/outlines/
//! chapters/entities/relationships/styles/plugins/memory/analysis-tasks plus the six
//! streaming endpoints (chapter generate, outline continue, and the three wizard
//! stages) that drive the four C8 orchestrators end to end.
//!
//! **Public API**: [`run_server`], [`run_server_on_listener`].

mod app;
mod error;
mod routes;
mod sse;
mod tenant_id;

use std::sync::Arc;

use fabula_core::llm::ChatOpenAI;
use fabula_core::memory::OpenAIEmbedder;
use fabula_core::tools::ToolRegistry;
use fabula_core::{LlmClient, OrchestratorContext, TenantRegistry};
use tokio::net::TcpListener;
use tracing::info;

use app::{router, AppState};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Builds the [`OrchestratorContext`] from the process environment: `FABULA_DATA_DIR`
/// (default `./fabula-data`) for the per-tenant SQLite partitions, `FABULA_LLM_MODEL`
/// (default `gpt-4o-mini`) for the chat model, and `OPENAI_API_KEY`/`OPENAI_BASE_URL`
/// consumed directly by `async-openai`. An embedder is wired in only when
/// `OPENAI_EMBEDDING_MODEL` is set; without it, memory search falls back to C3's
/// lexical degrade path. Always carries a (possibly empty) tool registry so
/// `POST /tenants/:id/plugins` has somewhere to load MCP tools into (§4.4).
fn context_from_env() -> OrchestratorContext {
    if let Err(e) = fabula_config::load_and_apply("fabula", None) {
        tracing::warn!("config load skipped: {}", e);
    }

    let data_dir = std::env::var("FABULA_DATA_DIR").unwrap_or_else(|_| "./fabula-data".to_string());
    let model = std::env::var("FABULA_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

    let embedder = std::env::var("OPENAI_EMBEDDING_MODEL")
        .ok()
        .map(|model| Arc::new(OpenAIEmbedder::new(model)) as Arc<dyn fabula_core::Embedder>);

    let registry = Arc::new(TenantRegistry::new(data_dir, embedder));
    let llm: Arc<dyn LlmClient> = Arc::new(ChatOpenAI::new(model));
    let tools = Arc::new(ToolRegistry::new());
    OrchestratorContext::new(registry, llm).with_tools(tools)
}

/// Runs the server on an existing listener; used by tests (bind to `127.0.0.1:0`,
/// then pass the listener so the ephemeral port is known before `serve` blocks).
pub async fn run_server_on_listener(
    listener: TcpListener,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("fabula-server listening on http://{}", addr);

    let state = Arc::new(AppState {
        ctx: context_from_env(),
    });
    let app = router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the server, binding `addr` (default `127.0.0.1:8080`).
pub async fn run_server(addr: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_server_on_listener(listener).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::llm::MockLlm;
    use fabula_core::model::{now_millis, AnalysisTask, Project, TaskStatus};

    /// Scenario: a task observed `running` for over a minute is reported `failed`
    /// by the next status query, even though nothing ever drove the orchestrator
    /// itself to notice.
    #[tokio::test]
    async fn analysis_task_status_applies_auto_recovery_over_http() {
        let data_dir = std::env::temp_dir().join(format!("fabula-server-test-{}", uuid::Uuid::new_v4()));
        let registry = Arc::new(TenantRegistry::new(data_dir, None));
        let handle = registry.acquire("tenant-a").await.unwrap();
        handle.store.create_project(Project::new("p1", "user-1", "Night Market")).await.unwrap();
        let mut task = AnalysisTask::new("task-1", "p1", "chapter-1");
        task.status = TaskStatus::Running;
        task.updated_at = now_millis() - 90_000;
        handle.store.create_analysis_task(task).await.unwrap();

        let ctx = OrchestratorContext::new(registry, Arc::new(MockLlm::fixed("unused")) as Arc<dyn LlmClient>);
        let state = Arc::new(AppState { ctx });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{addr}/projects/p1/analysis-tasks/task-1"))
            .header("x-tenant-id", "tenant-a")
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "failed");
        assert!(body["last_error"].as_str().unwrap().contains("auto-recovered"));
    }
}
