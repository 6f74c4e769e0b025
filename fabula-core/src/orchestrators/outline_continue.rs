//! Outline Continue (§4.8.2): extend a project's outline, either generating the
//! whole thing fresh ("new" mode) or appending to what exists ("continue" mode)
//! in fixed-size batches.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::OrchestratorError;
use crate::llm::Message;
use crate::memory::build_context;
use crate::model::{Chapter, OutlineNode};
use crate::retry::{self, BatchError};
use crate::stream::EventEmitter;

use super::{run_tool_pre_pass, OrchestratorContext};

pub const OUTLINE_BATCH_SIZE: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineContinueMode {
    Auto,
    New,
    Continue,
}

pub struct OutlineContinueRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub total_chapters: u32,
    pub mode: OutlineContinueMode,
    pub plot_stage_hint: Option<String>,
    pub story_direction: Option<String>,
    pub enable_tools: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedOutlineItem {
    title: String,
    summary: String,
}

pub async fn run_outline_continue(
    ctx: &OrchestratorContext,
    request: OutlineContinueRequest,
    emitter: &EventEmitter,
) -> Result<serde_json::Value, OrchestratorError> {
    let handle = ctx.registry.acquire(&request.tenant_id).await.map_err(|e| OrchestratorError::Internal(e.to_string()))?;

    let project = handle
        .store
        .get_project(&request.project_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("project {}", request.project_id)))?;

    let existing = handle.store.list_outline_nodes(&request.project_id).await?;
    let resolved_mode = match request.mode {
        OutlineContinueMode::Auto => {
            if existing.is_empty() {
                OutlineContinueMode::New
            } else {
                OutlineContinueMode::Continue
            }
        }
        other => other,
    };

    let guard = handle.write_lock().await;

    let mut created: Vec<OutlineNode> = Vec::new();
    let mut next_order = 1u32;

    if resolved_mode == OutlineContinueMode::New {
        emitter.progress("clearing existing outline", 5).await;
        handle.store.delete_outline_and_chapters(&request.project_id).await?;
    } else {
        next_order = existing.iter().map(|n| n.order_index).max().unwrap_or(0) + 1;
    }

    let mut chapters_so_far: Vec<Chapter> = if resolved_mode == OutlineContinueMode::Continue {
        let mut chapters = handle.store.list_chapters(&request.project_id).await?;
        chapters.sort_by_key(|c| c.chapter_number);
        chapters
    } else {
        Vec::new()
    };

    let batches = retry::partition(request.total_chapters, OUTLINE_BATCH_SIZE);
    let total_batches = batches.len();
    let mut running_total = 0u32;

    for (batch_idx, batch_size) in batches.into_iter().enumerate() {
        let percent = ((batch_idx as f32 / total_batches.max(1) as f32) * 80.0) as u8 + 10;
        emitter.progress(format!("generating outline batch {}/{}", batch_idx + 1, total_batches), percent).await;

        let items = if resolved_mode == OutlineContinueMode::New {
            retry::run_batch_with_retry(
                batch_size,
                retry::DEFAULT_MAX_RETRIES,
                |attempt| {
                    let prompt = ctx.composer.outline_complete(&project.title, request.story_direction.as_deref(), batch_size, attempt);
                    call_outline_llm(ctx, prompt)
                },
                validate_count,
            )
            .await
        } else {
            let prior_nodes: Vec<OutlineNode> = created
                .iter()
                .cloned()
                .chain(existing.iter().cloned())
                .collect();

            let query = request
                .plot_stage_hint
                .as_deref()
                .or(request.story_direction.as_deref())
                .unwrap_or(&project.title)
                .to_string();
            let context = build_context(
                &handle.memory,
                &request.project_id,
                next_order,
                &chapters_so_far,
                &query,
                None,
                crate::memory::DEFAULT_RECENT_CHAPTERS,
                crate::memory::DEFAULT_TOP_K,
            )
            .await?;
            let tool_reference = if request.enable_tools { run_tool_pre_pass(ctx, &query).await } else { None };

            retry::run_batch_with_retry(
                batch_size,
                retry::DEFAULT_MAX_RETRIES,
                |attempt| {
                    let prompt = ctx.composer.outline_continue_with_context(
                        &project.title,
                        request.plot_stage_hint.as_deref(),
                        request.story_direction.as_deref(),
                        &prior_nodes,
                        batch_size,
                        attempt,
                        &context,
                        tool_reference.as_deref(),
                    );
                    call_outline_llm(ctx, prompt)
                },
                validate_count,
            )
            .await
        }
        .map_err(batch_error_to_orchestrator)?;

        for item in items {
            let mut node = OutlineNode::new(uuid::Uuid::new_v4().to_string(), &request.project_id, item.title.clone());
            node.order_index = next_order;
            node.summary = item.summary.clone();
            handle.store.create_outline_node(node.clone()).await?;

            let mut chapter = Chapter::new(uuid::Uuid::new_v4().to_string(), &request.project_id, next_order);
            chapter.title = item.title;
            chapter.summary = item.summary;
            chapter.outline_id = Some(node.id.clone());
            handle.store.create_chapter(chapter.clone()).await?;
            chapters_so_far.push(chapter);

            created.push(node);
            next_order += 1;
            running_total += 1;
        }
    }

    drop(guard);

    emitter.progress("outline complete", 95).await;
    let payload = json!({
        "total_chapters": running_total,
        "outlines": created.iter().map(|n| json!({"id": n.id, "order_index": n.order_index, "title": n.title})).collect::<Vec<_>>(),
    });
    emitter.result(payload.clone()).await;
    emitter.done().await;
    Ok(payload)
}

async fn call_outline_llm(ctx: &OrchestratorContext, prompt: String) -> Result<Vec<GeneratedOutlineItem>, BatchError> {
    let response = ctx
        .llm
        .invoke(&[Message::user(prompt)])
        .await
        .map_err(|e| BatchError::InvalidResponse(e.to_string()))?;
    let cleaned = retry::strip_json_fences(&response.content);
    serde_json::from_str(&cleaned).map_err(|e| BatchError::InvalidResponse(e.to_string()))
}

fn validate_count<T>(items: &[T]) -> Result<(), String> {
    if items.is_empty() {
        Err("empty batch".to_string())
    } else {
        Ok(())
    }
}

fn batch_error_to_orchestrator(e: BatchError) -> OrchestratorError {
    match e {
        BatchError::InvalidResponse(msg) => OrchestratorError::LlmInvalidResponse(msg),
        BatchError::ExhaustedRetries(attempts, msg) => {
            OrchestratorError::LlmInvalidResponse(format!("failed after {attempts} attempts: {msg}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::model::Project;
    use crate::tenant::TenantRegistry;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("fabula-oc-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn auto_mode_chooses_new_when_outline_empty() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let handle = registry.acquire("tenant-a").await.unwrap();
        handle.store.create_project(Project::new("p1", "user-1", "Night Market")).await.unwrap();

        let reply = serde_json::to_string(&vec![
            GeneratedOutlineItemMirror { title: "Arrival".into(), summary: "s1".into() },
            GeneratedOutlineItemMirror { title: "Descent".into(), summary: "s2".into() },
        ])
        .unwrap();
        let ctx = OrchestratorContext::new(registry.clone(), Arc::new(MockLlm::fixed(reply)));
        let (tx, _rx) = mpsc::channel(16);
        let emitter = EventEmitter::new(tx);

        let request = OutlineContinueRequest {
            tenant_id: "tenant-a".into(),
            project_id: "p1".into(),
            total_chapters: 2,
            mode: OutlineContinueMode::Auto,
            plot_stage_hint: None,
            story_direction: None,
            enable_tools: false,
        };
        let result = run_outline_continue(&ctx, request, &emitter).await.unwrap();
        assert_eq!(result["total_chapters"], 2);

        let nodes = handle.store.list_outline_nodes("p1").await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].order_index, 1);
        assert_eq!(nodes[1].order_index, 2);
    }

    #[derive(Serialize)]
    struct GeneratedOutlineItemMirror {
        title: String,
        summary: String,
    }

    fn outline_batch(n: usize, start: usize) -> String {
        let items: Vec<GeneratedOutlineItemMirror> = (0..n)
            .map(|i| GeneratedOutlineItemMirror {
                title: format!("Chapter {}", start + i),
                summary: format!("summary {}", start + i),
            })
            .collect();
        serde_json::to_string(&items).unwrap()
    }

    #[tokio::test]
    async fn continue_mode_splits_into_fixed_size_batches() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let handle = registry.acquire("tenant-a").await.unwrap();
        handle.store.create_project(Project::new("p1", "user-1", "Night Market")).await.unwrap();
        for i in 1..=12u32 {
            let mut node = OutlineNode::new(format!("o{i}"), "p1", format!("Chapter {i}"));
            node.order_index = i;
            handle.store.create_outline_node(node).await.unwrap();
        }

        // 7 more in continue mode -> batches of 5 then 2.
        let ctx = OrchestratorContext::new(
            registry.clone(),
            Arc::new(MockLlm::scripted(vec![outline_batch(5, 13), outline_batch(2, 18)])),
        );
        let (tx, _rx) = mpsc::channel(16);
        let emitter = EventEmitter::new(tx);

        let request = OutlineContinueRequest {
            tenant_id: "tenant-a".into(),
            project_id: "p1".into(),
            total_chapters: 7,
            mode: OutlineContinueMode::Continue,
            plot_stage_hint: None,
            story_direction: None,
            enable_tools: false,
        };
        let result = run_outline_continue(&ctx, request, &emitter).await.unwrap();
        assert_eq!(result["total_chapters"], 7);

        let nodes = handle.store.list_outline_nodes("p1").await.unwrap();
        assert_eq!(nodes.len(), 19);
        let indices: Vec<u32> = nodes.iter().map(|n| n.order_index).collect();
        assert_eq!(indices, (1..=19).collect::<Vec<u32>>());

        let chapters = handle.store.list_chapters("p1").await.unwrap();
        assert_eq!(chapters.len(), 7);
    }

    #[tokio::test]
    async fn continue_mode_folds_memory_and_tool_context_into_the_prompt() {
        use crate::memory::MemoryStore;
        use crate::model::{MemoryFragment, MemoryType};
        use crate::tool_source::{ToolCallContent, ToolCallContext, ToolSourceError, ToolSpec};
        use crate::tools::{Tool, ToolRegistry};

        struct EchoTool;

        #[async_trait::async_trait]
        impl Tool for EchoTool {
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
            async fn call(&self, _args: serde_json::Value, _ctx: Option<&ToolCallContext>) -> Result<ToolCallContent, ToolSourceError> {
                Ok(ToolCallContent { text: "the map leads north".into() })
            }
        }

        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let handle = registry.acquire("tenant-a").await.unwrap();
        handle.store.create_project(Project::new("p1", "user-1", "Night Market")).await.unwrap();
        let mut node = OutlineNode::new("o1", "p1", "Chapter 1");
        node.order_index = 1;
        handle.store.create_outline_node(node).await.unwrap();

        let mut foreshadow = MemoryFragment::new("f1", "p1", MemoryType::Foreshadow, "a torn map", "mentioned once");
        foreshadow.foreshadow_state = 1;
        handle.memory.put(foreshadow).await.unwrap();

        let tools = Arc::new(ToolRegistry::new());
        tools.register(Arc::new(EchoTool)).await;
        let llm = Arc::new(MockLlm::scripted(vec![
            r#"{"tool_call": {"name": "lore_lookup", "arguments": {}}}"#.to_string(),
            "the map leads north".to_string(),
            outline_batch(1, 2),
        ]));
        let ctx = OrchestratorContext::new(registry.clone(), llm).with_tools(tools);
        let (tx, _rx) = mpsc::channel(16);
        let emitter = EventEmitter::new(tx);

        let request = OutlineContinueRequest {
            tenant_id: "tenant-a".into(),
            project_id: "p1".into(),
            total_chapters: 1,
            mode: OutlineContinueMode::Continue,
            plot_stage_hint: None,
            story_direction: None,
            enable_tools: true,
        };
        let result = run_outline_continue(&ctx, request, &emitter).await.unwrap();
        assert_eq!(result["total_chapters"], 1);

        let nodes = handle.store.list_outline_nodes("p1").await.unwrap();
        assert_eq!(nodes.len(), 2);
    }
}
