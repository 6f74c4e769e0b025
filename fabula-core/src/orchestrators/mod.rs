//! C8 Orchestrators: the four request handlers that drive the engine end to end.
//!
//! Each orchestrator follows the same shape: acquire the tenant handle (C1),
//! gather context (C3), compose a prompt (C7), call the LLM (C2) while streaming
//! through the emitter (C5), then persist and emit a terminal event. Retries and
//! batching route through C6; chapter analysis derivation routes through
//! [`crate::analysis`].

mod chapter_analyze;
mod chapter_generate;
mod outline_continue;
mod wizard;

pub use chapter_analyze::{
    apply_auto_recovery, run_chapter_analyze, ChapterAnalyzeRequest, ANALYSIS_PENDING_TIMEOUT_SECS,
    ANALYSIS_RUNNING_TIMEOUT_SECS,
};
pub use chapter_generate::{run_chapter_generate, ChapterGenerateRequest};
pub use outline_continue::{run_outline_continue, OutlineContinueMode, OutlineContinueRequest, OUTLINE_BATCH_SIZE};
pub use wizard::{run_wizard_characters, run_wizard_cleanup, run_wizard_outline, run_wizard_world, WizardCharactersRequest, WizardOutlineRequest, WizardWorldRequest};

use std::sync::Arc;

use crate::llm::{LlmClient, ToolChoice};
use crate::prompt::PromptComposer;
use crate::tenant::TenantRegistry;
use crate::tool_source::ToolSource;
use crate::tools::ToolRegistry;

/// Upper bound on tool-call round trips a single pre-pass may take (§4.2).
const MAX_TOOL_ROUNDS: u32 = 4;

/// Shared dependencies every orchestrator needs: the tenant registry (C1), the LLM
/// adapter (C2), and the prompt composer (C7). `tools` is optional; only
/// chapter-generate's pre-pass and `generate_with_tools` rounds touch it.
#[derive(Clone)]
pub struct OrchestratorContext {
    pub registry: Arc<TenantRegistry>,
    pub llm: Arc<dyn LlmClient>,
    pub composer: Arc<PromptComposer>,
    pub tools: Option<Arc<ToolRegistry>>,
}

impl OrchestratorContext {
    pub fn new(registry: Arc<TenantRegistry>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            registry,
            llm,
            composer: Arc::new(PromptComposer::new()),
            tools: None,
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Lists the chapter numbers missing from `1..=upto` given what's already present.
/// Used by every orchestrator that requires prior chapters to exist before acting
/// on chapter `upto` (chapter-generate's prerequisite check, outline-continue's
/// "new" vs "continue" mode decision).
pub(crate) fn missing_chapter_numbers(existing: &[u32], upto: u32) -> Vec<u32> {
    (1..upto).filter(|n| !existing.contains(n)).collect()
}

/// Optional pre-pass: asks the LLM to gather reference material via the tenant's
/// tool registry before a generation call, bounded by `MAX_TOOL_ROUNDS`. Shared by
/// chapter-generate's draft step and outline-continue's per-batch composition.
/// Returns `None` when no tools are registered or enabled; a missing/empty tool
/// set, or a failed call, degrades silently rather than failing the request.
pub(crate) async fn run_tool_pre_pass(ctx: &OrchestratorContext, query: &str) -> Option<String> {
    let tools = ctx.tools.as_ref()?;
    if tools.is_empty().await {
        return None;
    }
    let prompt = format!(
        "Gather any reference material relevant to the following request, \
         calling tools as needed, then summarize what you found in a few sentences:\n\n{query}"
    );
    let result = ctx
        .llm
        .generate_with_tools(&prompt, tools.as_ref() as &dyn ToolSource, MAX_TOOL_ROUNDS, ToolChoice::Auto)
        .await
        .ok()?;
    if result.tool_calls_made == 0 || result.content.trim().is_empty() {
        return None;
    }
    Some(result.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_chapter_numbers_lists_gaps_before_upto() {
        let existing = vec![1, 2, 4];
        assert_eq!(missing_chapter_numbers(&existing, 5), vec![3]);
    }

    #[test]
    fn missing_chapter_numbers_empty_when_contiguous() {
        let existing = vec![1, 2, 3];
        assert_eq!(missing_chapter_numbers(&existing, 4), Vec::<u32>::new());
    }
}
