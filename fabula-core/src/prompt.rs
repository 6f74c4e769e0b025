//! C7 Prompt Composer: produces a single prompt string from named typed inputs.
//!
//! Templates are versioned by orchestration task (world, characters-batch,
//! outline-complete, outline-continue, chapter-generate, chapter-generate-with-context,
//! analysis). Composition rules (§4.7):
//! - missing inputs default to the literal `"未设定"`; empty strings are never
//!   interpolated raw.
//! - memory-context slices are emitted as labeled sections only when non-empty.
//! - tool-reference blocks are appended verbatim as a reference section.
//! - continuation prompts sample a skeleton of all prior items every 50th node,
//!   summarize the most recent 20, and carry full text of the last 2.

use crate::memory::MemoryContextBundle;
use crate::model::{OutlineNode, WritingStyle};

/// Literal default the spec mandates for missing/empty inputs.
pub const UNSPECIFIED: &str = "未设定";

fn field(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNSPECIFIED,
    }
}

#[derive(Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    /// Wizard stage W1: the four world fields from title/theme/genre.
    pub fn world(&self, title: &str, theme: Option<&str>, genre: Option<&str>) -> String {
        format!(
            "你是一名长篇小说世界观设定助手。根据以下信息生成四个世界观字段（时代背景、地点、氛围、规则），以 JSON 输出：\n\
             标题：{}\n主题：{}\n类型：{}\n\n严格输出 JSON，字段为 time_period, location, atmosphere, rules。",
            field(Some(title)),
            field(theme),
            field(genre),
        )
    }

    /// Wizard stage W2: one batch of `count` characters, with retry escalation.
    pub fn characters_batch(
        &self,
        project_title: &str,
        world_summary: Option<&str>,
        existing_names: &[String],
        count: u32,
        attempt: u32,
    ) -> String {
        let mut prompt = format!(
            "为小说《{}》生成 {} 个角色，世界观：{}。\n",
            field(Some(project_title)),
            count,
            field(world_summary),
        );
        if !existing_names.is_empty() {
            prompt.push_str(&format!("已有角色：{}。新角色不要重名。\n", existing_names.join("、")));
        }
        prompt.push_str(
            "为每个角色给出 name, description, relationships_array（仅可引用本批次角色名）, \
             organization_memberships（每项包含 organization 和该角色在组织中的职位 position，\
             仅可引用本批次标记为组织的角色名）。严格输出 JSON 数组。",
        );
        push_retry_escalation(&mut prompt, attempt, count);
        prompt
    }

    /// Wizard stage W3 / outline-continue "new" mode: the whole outline in one call.
    pub fn outline_complete(&self, project_title: &str, story_direction: Option<&str>, count: u32, attempt: u32) -> String {
        let mut prompt = format!(
            "为小说《{}》生成完整的 {} 章大纲，故事方向：{}。每章给出 title 和 summary。严格输出 JSON 数组。",
            field(Some(project_title)),
            count,
            field(story_direction),
        );
        push_retry_escalation(&mut prompt, attempt, count);
        prompt
    }

    /// Outline-continue "continue" mode: one batch of `count` new outline nodes,
    /// given the skeleton/recent/full-text view of what already exists.
    pub fn outline_continue(
        &self,
        project_title: &str,
        plot_stage_hint: Option<&str>,
        story_direction: Option<&str>,
        existing: &[OutlineNode],
        count: u32,
        attempt: u32,
    ) -> String {
        let mut prompt = format!(
            "继续为小说《{}》生成接下来的 {} 章大纲。当前阶段：{}。故事方向：{}。\n\n{}",
            field(Some(project_title)),
            count,
            field(plot_stage_hint),
            field(story_direction),
            continuation_digest(existing, |n| n.title.clone(), |n| n.summary.clone()),
        );
        prompt.push_str("\n每章给出 title 和 summary，order_index 紧接现有大纲。严格输出 JSON 数组。");
        push_retry_escalation(&mut prompt, attempt, count);
        prompt
    }

    /// Same as [`Self::outline_continue`], folding in this batch's own C3 memory
    /// context bundle and an optional tool-reference block so later batches stay
    /// consistent with memory planted by earlier ones.
    #[allow(clippy::too_many_arguments)]
    pub fn outline_continue_with_context(
        &self,
        project_title: &str,
        plot_stage_hint: Option<&str>,
        story_direction: Option<&str>,
        existing: &[OutlineNode],
        count: u32,
        attempt: u32,
        context: &MemoryContextBundle,
        tool_reference: Option<&str>,
    ) -> String {
        let mut prompt = self.outline_continue(project_title, plot_stage_hint, story_direction, existing, count, attempt);

        let mut sections = String::new();
        push_labeled_section(&mut sections, "相关记忆", &context.relevant_memories.text);
        push_labeled_section(&mut sections, "未解决的伏笔", &context.foreshadows.text);
        push_labeled_section(&mut sections, "关键情节点", &context.plot_points.text);
        if let Some(reference) = tool_reference {
            if !reference.trim().is_empty() {
                sections.push_str(&format!("\n\n## 工具参考资料\n{reference}"));
            }
        }

        if !sections.is_empty() {
            prompt.push_str("\n\n# 上下文\n");
            prompt.push_str(&sections);
        }
        prompt
    }

    /// Chapter generation without memory context (first chapter, or context disabled).
    pub fn chapter_generate(
        &self,
        project_title: &str,
        outline_title: &str,
        outline_summary: &str,
        style: &WritingStyle,
        target_words: u32,
    ) -> String {
        format!(
            "为小说《{}》撰写第该章正文。\n章节大纲：{}\n梗概：{}\n\n{}\n\n目标字数约 {} 字。只输出正文，不要附加说明。",
            field(Some(project_title)),
            field(Some(outline_title)),
            field(Some(outline_summary)),
            style_section(style),
            target_words,
        )
    }

    /// Chapter generation with the C3 memory context bundle and an optional
    /// tool-reference block from a pre-pass round.
    pub fn chapter_generate_with_context(
        &self,
        project_title: &str,
        outline_title: &str,
        outline_summary: &str,
        style: &WritingStyle,
        target_words: u32,
        context: &MemoryContextBundle,
        tool_reference: Option<&str>,
    ) -> String {
        let mut prompt = self.chapter_generate(project_title, outline_title, outline_summary, style, target_words);

        let mut sections = String::new();
        push_labeled_section(&mut sections, "近期章节", &context.recent_context.text);
        push_labeled_section(&mut sections, "相关记忆", &context.relevant_memories.text);
        push_labeled_section(&mut sections, "未解决的伏笔", &context.foreshadows.text);
        push_labeled_section(&mut sections, "角色当前状态", &context.character_states.text);
        push_labeled_section(&mut sections, "关键情节点", &context.plot_points.text);
        if let Some(reference) = tool_reference {
            if !reference.trim().is_empty() {
                sections.push_str(&format!("\n\n## 工具参考资料\n{reference}"));
            }
        }

        if !sections.is_empty() {
            prompt.push_str("\n\n# 上下文\n");
            prompt.push_str(&sections);
        }
        prompt
    }

    /// Chapter analysis request (§4.8.4 step 2). Caller truncates content to 8000
    /// chars before calling this.
    pub fn analysis(&self, chapter_title: &str, chapter_content_truncated: &str) -> String {
        format!(
            "分析以下章节正文，严格输出 JSON，字段为 hooks, foreshadows, plot_points, character_states, \
             conflict, emotional_arc, scenes, pacing, scores, suggestions, plot_stage, dialogue_ratio, \
             description_ratio。\n\n章节标题：{}\n正文：\n{}",
            field(Some(chapter_title)),
            chapter_content_truncated,
        )
    }
}

fn style_section(style: &WritingStyle) -> String {
    format!(
        "文风：{}，人称：{}，时态：{}，节奏：{}，词汇水平：{}。",
        style.tone, style.pov, style.tense, style.pacing_preference, style.vocabulary_level,
    )
}

fn push_labeled_section(out: &mut String, label: &str, text: &str) {
    if !text.trim().is_empty() {
        out.push_str(&format!("\n## {label}\n{text}\n"));
    }
}

fn push_retry_escalation(prompt: &mut String, attempt: u32, requested: u32) {
    if attempt > 0 {
        prompt.push_str(&format!("\n\n注意：这是第 {attempt} 次重试，必须严格输出 {requested} 条目。"));
    }
}

/// Builds the continuation digest (§4.7): a skeleton of every 50th prior item,
/// full text of the last 2, and plain summaries of everything in between within
/// the most recent 20.
fn continuation_digest<T>(items: &[T], title: impl Fn(&T) -> String, summary: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut out = String::new();

    let skeleton: Vec<String> = items
        .iter()
        .enumerate()
        .filter(|(i, _)| (i + 1) % 50 == 0)
        .map(|(i, item)| format!("{}: {}", i + 1, title(item)))
        .collect();
    if !skeleton.is_empty() {
        out.push_str("## 全局骨架（每 50 章采样）\n");
        out.push_str(&skeleton.join("\n"));
        out.push('\n');
    }

    let recent_count = items.len().min(20);
    let recent = &items[items.len() - recent_count..];
    let full_text_count = recent.len().min(2);
    let summarized = &recent[..recent.len() - full_text_count];
    let full_text = &recent[recent.len() - full_text_count..];

    if !summarized.is_empty() {
        out.push_str("\n## 最近 20 章摘要\n");
        for item in summarized {
            out.push_str(&format!("- {}: {}\n", title(item), summary(item)));
        }
    }

    if !full_text.is_empty() {
        out.push_str("\n## 最近两章全文\n");
        for item in full_text {
            out.push_str(&format!("### {}\n{}\n", title(item), summary(item)));
        }
    }

    out
}
