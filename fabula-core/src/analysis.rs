//! C9 Analysis Ingestor: derives [`MemoryFragment`]s from a [`ChapterAnalysis`].
//!
//! Pure derivation: no store access. Callers persist the returned fragments
//! themselves (typically through a tenant's [`crate::memory::MemoryStore`]), which
//! keeps this module testable without a database.

use crate::model::{ChapterAnalysis, MemoryFragment, MemoryType};

const CHAPTER_SUMMARY_IMPORTANCE: f32 = 0.6;
const HOOK_STRENGTH_THRESHOLD: f32 = 6.0;
const PLOT_POINT_IMPORTANCE_THRESHOLD: f32 = 0.6;
const HIGH_CONFLICT_THRESHOLD: u8 = 7;
const SUMMARY_FALLBACK_CHARS: usize = 300;
const PREFIX_MATCH_CHARS: usize = 15;

/// Derives the full set of memory fragments for a chapter's analysis, per §4.9.
/// `chapter_content` is the chapter's full prose, used both as the last-resort
/// summary fallback and as the text each fragment's keyword is located within.
pub fn derive_fragments(
    analysis: &ChapterAnalysis,
    chapter_number: i64,
    chapter_content: &str,
) -> Vec<MemoryFragment> {
    let mut fragments = Vec::new();

    fragments.push(chapter_summary_fragment(analysis, chapter_number, chapter_content));

    for hook in &analysis.hooks {
        if hook.strength >= HOOK_STRENGTH_THRESHOLD {
            fragments.push(hook_fragment(analysis, chapter_number, hook, chapter_content));
        }
    }

    for foreshadow in &analysis.foreshadows {
        fragments.push(foreshadow_fragment(analysis, chapter_number, foreshadow, chapter_content));
    }

    for point in &analysis.plot_points {
        if point.importance >= PLOT_POINT_IMPORTANCE_THRESHOLD {
            fragments.push(plot_point_fragment(analysis, chapter_number, &point.content, point.importance, chapter_content));
        }
    }

    for delta in &analysis.character_states {
        fragments.push(character_event_fragment(analysis, chapter_number, delta, chapter_content));
    }

    if analysis.conflict_level >= HIGH_CONFLICT_THRESHOLD {
        let content = format!("第{chapter_number}章冲突强度达到 {}/10。", analysis.conflict_level);
        let mut synthetic = plot_point_fragment(analysis, chapter_number, &content, 1.0, chapter_content);
        synthetic.tags.push("conflict".to_string());
        fragments.push(synthetic);
    }

    fragments
}

fn chapter_summary_fragment(analysis: &ChapterAnalysis, chapter_number: i64, chapter_content: &str) -> MemoryFragment {
    let summary = if !analysis.analysis_report.trim().is_empty() {
        analysis.analysis_report.clone()
    } else if !analysis.plot_points.is_empty() {
        analysis
            .plot_points
            .iter()
            .take(3)
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("；")
    } else {
        chapter_content.chars().take(SUMMARY_FALLBACK_CHARS).collect()
    };

    let mut fragment = MemoryFragment::new(
        format!("{}-summary", analysis.chapter_id),
        analysis.project_id.clone(),
        MemoryType::ChapterSummary,
        format!("第{chapter_number}章摘要"),
        summary,
    );
    fragment.chapter_id = Some(analysis.chapter_id.clone());
    fragment.tags = vec!["summary".to_string()];
    fragment.importance_score = CHAPTER_SUMMARY_IMPORTANCE;
    fragment.story_timeline = chapter_number;
    locate_keyword(&mut fragment, chapter_content, &analysis.analysis_report);
    fragment
}

fn hook_fragment(
    analysis: &ChapterAnalysis,
    chapter_number: i64,
    hook: &crate::model::Hook,
    chapter_content: &str,
) -> MemoryFragment {
    let mut fragment = MemoryFragment::new(
        format!("{}-hook-{}", analysis.chapter_id, hook.position),
        analysis.project_id.clone(),
        MemoryType::Hook,
        format!("第{chapter_number}章悬念"),
        hook.content.clone(),
    );
    fragment.chapter_id = Some(analysis.chapter_id.clone());
    fragment.tags = vec!["hook".to_string()];
    fragment.importance_score = (hook.strength / 10.0).clamp(0.0, 1.0);
    fragment.story_timeline = chapter_number;
    locate_keyword(&mut fragment, chapter_content, &hook.content);
    fragment
}

fn foreshadow_fragment(
    analysis: &ChapterAnalysis,
    chapter_number: i64,
    foreshadow: &crate::model::Foreshadow,
    chapter_content: &str,
) -> MemoryFragment {
    let mut fragment = MemoryFragment::new(
        format!("{}-foreshadow-{}", analysis.chapter_id, fragment_slug(&foreshadow.content)),
        analysis.project_id.clone(),
        MemoryType::Foreshadow,
        format!("第{chapter_number}章伏笔"),
        foreshadow.content.clone(),
    );
    fragment.chapter_id = Some(analysis.chapter_id.clone());
    fragment.tags = vec!["foreshadow".to_string(), foreshadow.kind.clone()];
    fragment.importance_score = (foreshadow.strength / 10.0).clamp(0.0, 1.0);
    fragment.story_timeline = chapter_number;
    fragment.foreshadow_state = match foreshadow.kind.as_str() {
        "resolved" => 2,
        _ => 1,
    };
    locate_keyword(&mut fragment, chapter_content, &foreshadow.content);
    fragment
}

fn plot_point_fragment(
    analysis: &ChapterAnalysis,
    chapter_number: i64,
    content: &str,
    importance: f32,
    chapter_content: &str,
) -> MemoryFragment {
    let mut fragment = MemoryFragment::new(
        format!("{}-plot-{}", analysis.chapter_id, fragment_slug(content)),
        analysis.project_id.clone(),
        MemoryType::PlotPoint,
        format!("第{chapter_number}章情节点"),
        content.to_string(),
    );
    fragment.chapter_id = Some(analysis.chapter_id.clone());
    fragment.tags = vec!["plot_point".to_string()];
    fragment.importance_score = importance.clamp(0.0, 1.0);
    fragment.story_timeline = chapter_number;
    locate_keyword(&mut fragment, chapter_content, content);
    fragment
}

fn character_event_fragment(
    analysis: &ChapterAnalysis,
    chapter_number: i64,
    delta: &crate::model::CharacterStateDelta,
    chapter_content: &str,
) -> MemoryFragment {
    let content = format!("{} -> {}（{}）", delta.state_before, delta.state_after, delta.key_event);
    let mut fragment = MemoryFragment::new(
        format!("{}-character-{}", analysis.chapter_id, delta.character_id),
        analysis.project_id.clone(),
        MemoryType::CharacterEvent,
        delta.character_name.clone(),
        content,
    );
    fragment.chapter_id = Some(analysis.chapter_id.clone());
    fragment.related_characters = vec![delta.character_name.clone()];
    fragment.tags = vec!["character_event".to_string()];
    fragment.story_timeline = chapter_number;
    locate_keyword(&mut fragment, chapter_content, &delta.key_event);
    fragment
}

fn fragment_slug(content: &str) -> String {
    content.chars().take(12).collect::<String>().replace(char::is_whitespace, "_")
}

/// Implements the three-tier keyword location rule: exact match, then a match
/// against punctuation-stripped text, then a prefix match of the first 15 chars.
/// Leaves the sentinel `(-1, 0)` on failure.
fn locate_keyword(fragment: &mut MemoryFragment, chapter_content: &str, keyword: &str) {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return;
    }

    if let Some(byte_pos) = chapter_content.find(keyword) {
        fragment.chapter_position = chapter_content[..byte_pos].chars().count() as i64;
        fragment.text_length = keyword.chars().count() as i64;
        return;
    }

    let stripped_content = strip_punctuation(chapter_content);
    let stripped_keyword = strip_punctuation(keyword);
    if !stripped_keyword.is_empty() {
        if let Some(byte_pos) = stripped_content.find(&stripped_keyword) {
            fragment.chapter_position = stripped_content[..byte_pos].chars().count() as i64;
            fragment.text_length = stripped_keyword.chars().count() as i64;
            return;
        }
    }

    let prefix: String = keyword.chars().take(PREFIX_MATCH_CHARS).collect();
    if !prefix.is_empty() {
        if let Some(byte_pos) = chapter_content.find(&prefix) {
            fragment.chapter_position = chapter_content[..byte_pos].chars().count() as i64;
            fragment.text_length = prefix.chars().count() as i64;
            return;
        }
    }
}

fn strip_punctuation(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_punctuation() && !"，。！？、；：“”‘’（）《》".contains(*c)).collect()
}
