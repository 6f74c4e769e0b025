//! Chapter Generate (§4.8.1): draft one chapter's prose, then schedule its
//! background analysis.

use serde_json::json;

use crate::error::OrchestratorError;
use crate::llm::Message;
use crate::memory::build_context;
use crate::model::{AnalysisTask, Chapter, ChapterStatus};
use crate::stream::EventEmitter;

use super::{missing_chapter_numbers, run_tool_pre_pass, OrchestratorContext};

pub const DEFAULT_TARGET_WORDS: u32 = 3000;
pub const MIN_TARGET_WORDS: u32 = 500;
pub const MAX_TARGET_WORDS: u32 = 10_000;
const HISTORY_EXCERPT_CHARS: usize = 500;

pub struct ChapterGenerateRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub chapter_number: u32,
    pub outline_title: String,
    pub outline_summary: String,
    pub target_words: Option<u32>,
    pub enable_tools: bool,
}

/// Runs the chapter-generate orchestrator end to end, emitting `chunk` events as
/// prose streams in and a terminal `result` event on success.
pub async fn run_chapter_generate(
    ctx: &OrchestratorContext,
    request: ChapterGenerateRequest,
    emitter: &EventEmitter,
) -> Result<serde_json::Value, OrchestratorError> {
    let handle = ctx.registry.acquire(&request.tenant_id).await.map_err(|e| OrchestratorError::Internal(e.to_string()))?;

    let project = handle
        .store
        .get_project(&request.project_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("project {}", request.project_id)))?;

    let target_words = request
        .target_words
        .unwrap_or(DEFAULT_TARGET_WORDS)
        .clamp(MIN_TARGET_WORDS, MAX_TARGET_WORDS);

    let existing_chapters = handle.store.list_chapters(&request.project_id).await?;
    let existing_numbers: Vec<u32> = existing_chapters
        .iter()
        .filter(|c| !c.content.is_empty())
        .map(|c| c.chapter_number)
        .collect();
    let missing = missing_chapter_numbers(&existing_numbers, request.chapter_number);
    if !missing.is_empty() {
        return Err(OrchestratorError::Validation(format!(
            "prerequisite chapters missing: {missing:?}"
        )));
    }

    emitter.progress("building memory context", 10).await;
    let style = handle.store.get_project_default_style(&request.project_id).await?;
    let style = style.map(|s| s.style).unwrap_or_default();

    let mut prior_chapters: Vec<Chapter> = existing_chapters
        .into_iter()
        .filter(|c| c.chapter_number < request.chapter_number)
        .collect();
    prior_chapters.sort_by_key(|c| c.chapter_number);

    let context = build_context(
        &handle.memory,
        &request.project_id,
        request.chapter_number,
        &prior_chapters,
        &request.outline_summary,
        None,
        crate::memory::DEFAULT_RECENT_CHAPTERS,
        crate::memory::DEFAULT_TOP_K,
    )
    .await?;

    let tool_reference = if request.enable_tools {
        run_tool_pre_pass(ctx, &request.outline_summary).await
    } else {
        None
    };

    let prompt = ctx.composer.chapter_generate_with_context(
        &project.title,
        &request.outline_title,
        &request.outline_summary,
        &style,
        target_words,
        &context,
        tool_reference.as_deref(),
    );

    emitter.progress("drafting chapter", 30).await;
    let messages = vec![Message::user(prompt.clone())];
    let response = ctx.llm.invoke_stream(&messages, Some(emitter.sender())).await?;

    let guard = handle.write_lock().await;

    let mut chapter = handle
        .store
        .get_chapter_by_number(&request.project_id, request.chapter_number)
        .await?
        .unwrap_or_else(|| Chapter::new(uuid::Uuid::new_v4().to_string(), &request.project_id, request.chapter_number));
    chapter.title = request.outline_title.clone();
    let previous_word_count = chapter.word_count;
    chapter.set_content(response.content.clone());
    chapter.summary = request.outline_summary.clone();
    chapter.status = ChapterStatus::Draft;

    if chapter.id.is_empty() {
        handle.store.create_chapter(chapter.clone()).await?;
    } else {
        handle.store.update_chapter(chapter.clone()).await?;
    }

    let mut updated_project = project.clone();
    updated_project.current_words = updated_project
        .current_words
        .saturating_sub(previous_word_count)
        .saturating_add(chapter.word_count);
    handle.store.update_project(updated_project).await?;

    let prompt_excerpt: String = prompt.chars().take(HISTORY_EXCERPT_CHARS).collect();
    let content_excerpt: String = chapter.content.chars().take(HISTORY_EXCERPT_CHARS).collect();
    handle
        .store
        .append_generation_history(&request.project_id, &chapter.id, &prompt_excerpt, &content_excerpt, crate::model::now_millis())
        .await?;

    let analysis_task = AnalysisTask::new(uuid::Uuid::new_v4().to_string(), request.project_id.clone(), chapter.id.clone());
    handle.store.create_analysis_task(analysis_task.clone()).await?;

    drop(guard);

    emitter.progress("analysis_started", 90).await;

    let payload = json!({
        "word_count": chapter.word_count,
        "analysis_task_id": analysis_task.id,
    });
    emitter.result(payload.clone()).await;
    emitter.done().await;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::model::{Project, WritingStyle};
    use crate::tenant::TenantRegistry;
    use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
    use crate::tools::{Tool, ToolRegistry};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct LoreLookupTool;

    #[async_trait::async_trait]
    impl Tool for LoreLookupTool {
        fn name(&self) -> &str {
            "lore_lookup"
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "lore_lookup".into(),
                description: Some("looks up established lore".into()),
                input_schema: serde_json::json!({}),
            }
        }
        async fn call(
            &self,
            _args: serde_json::Value,
            _ctx: Option<&ToolCallContext>,
        ) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent {
                text: "the market closes at dusk".into(),
            })
        }
    }

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("fabula-cg-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    async fn seeded_handle(registry: &TenantRegistry, tenant_id: &str, project_id: &str) {
        let handle = registry.acquire(tenant_id).await.unwrap();
        let project = Project::new(project_id, "user-1", "Night Market");
        handle.store.create_project(project).await.unwrap();
        handle
            .store
            .set_project_default_style(crate::model::ProjectDefaultStyle::new(project_id, WritingStyle::default()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_when_prior_chapters_missing() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        seeded_handle(&registry, "tenant-a", "p1").await;
        let ctx = OrchestratorContext::new(registry, Arc::new(MockLlm::fixed("prose")));
        let (tx, _rx) = mpsc::channel(16);
        let emitter = EventEmitter::new(tx);

        let request = ChapterGenerateRequest {
            tenant_id: "tenant-a".into(),
            project_id: "p1".into(),
            chapter_number: 3,
            outline_title: "The Return".into(),
            outline_summary: "summary".into(),
            target_words: None,
            enable_tools: false,
        };
        let err = run_chapter_generate(&ctx, request, &emitter).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));
    }

    #[tokio::test]
    async fn generates_first_chapter_and_schedules_analysis() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        seeded_handle(&registry, "tenant-a", "p1").await;
        let ctx = OrchestratorContext::new(registry.clone(), Arc::new(MockLlm::fixed("Once upon a time.")));
        let (tx, mut rx) = mpsc::channel(16);
        let emitter = EventEmitter::new(tx);

        let request = ChapterGenerateRequest {
            tenant_id: "tenant-a".into(),
            project_id: "p1".into(),
            chapter_number: 1,
            outline_title: "The Beginning".into(),
            outline_summary: "summary".into(),
            target_words: None,
            enable_tools: false,
        };
        let result = run_chapter_generate(&ctx, request, &emitter).await.unwrap();
        assert!(result["analysis_task_id"].is_string());
        assert!(result["word_count"].as_u64().unwrap() > 0);

        let handle = registry.acquire("tenant-a").await.unwrap();
        let chapter = handle.store.get_chapter_by_number("p1", 1).await.unwrap().unwrap();
        assert_eq!(chapter.content, "Once upon a time.");

        let mut saw_done = false;
        while let Some(event) = rx.recv().await {
            if matches!(event, fabula_protocol::ProtocolEvent::Done {}) {
                saw_done = true;
                break;
            }
        }
        assert!(saw_done);
    }

    #[tokio::test]
    async fn tool_pre_pass_returns_none_when_registry_unset() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let ctx = OrchestratorContext::new(registry, Arc::new(MockLlm::fixed("unused")));
        assert!(run_tool_pre_pass(&ctx, "castle lore").await.is_none());
    }

    #[tokio::test]
    async fn tool_pre_pass_returns_none_when_registry_empty() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let tools = Arc::new(ToolRegistry::new());
        let ctx = OrchestratorContext::new(registry, Arc::new(MockLlm::fixed("unused"))).with_tools(tools);
        assert!(run_tool_pre_pass(&ctx, "castle lore").await.is_none());
    }

    #[tokio::test]
    async fn tool_pre_pass_dispatches_a_call_and_returns_a_summary() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let tools = Arc::new(ToolRegistry::new());
        tools.register(Arc::new(LoreLookupTool)).await;
        let llm = MockLlm::scripted(vec![
            r#"{"tool_call": {"name": "lore_lookup", "arguments": {}}}"#.to_string(),
            "the night market runs until dusk".to_string(),
        ]);
        let ctx = OrchestratorContext::new(registry, Arc::new(llm)).with_tools(tools);
        let result = run_tool_pre_pass(&ctx, "night market hours").await;
        assert_eq!(result.as_deref(), Some("the night market runs until dusk"));
    }
}
