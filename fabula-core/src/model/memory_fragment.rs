use serde::{Deserialize, Serialize};

use super::TimestampMillis;

/// Category of a narrative memory fragment; governs how it is weighted when
/// composing generation context (C3 `build_context`) and which fragments the
/// analysis ingestor (C9) is allowed to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    ChapterSummary,
    Hook,
    Foreshadow,
    PlotPoint,
    CharacterEvent,
}

/// A single retrievable unit of story memory: one plot beat, hook, foreshadow
/// plant/payoff, or character development, scoped to a project and optionally
/// to the chapter it came from. Embedded for semantic search (C3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryFragment {
    pub id: String,
    pub project_id: String,
    pub chapter_id: Option<String>,
    pub memory_type: MemoryType,
    pub title: String,
    pub content: String,
    pub related_characters: Vec<String>,
    pub tags: Vec<String>,
    pub importance_score: f32,
    /// Position in in-story chronology, distinct from `chapter_id` (a flashback's
    /// timeline position differs from the chapter it's narrated in).
    pub story_timeline: i64,
    /// 0 = not a foreshadow hook, 1 = planted and unresolved, 2 = resolved.
    pub foreshadow_state: u8,
    pub foreshadow_resolved_by: Option<String>,
    /// Best-effort offset of this fragment's keyword within the source chapter
    /// text, for downstream visualization; `(-1, 0)` when the keyword could not
    /// be located (C9 §4.9). Consumers must tolerate the sentinel.
    pub chapter_position: i64,
    pub text_length: i64,
    pub created_at: TimestampMillis,
}

impl MemoryFragment {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        memory_type: MemoryType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            chapter_id: None,
            memory_type,
            title: title.into(),
            content: content.into(),
            related_characters: Vec::new(),
            tags: Vec::new(),
            importance_score: 0.5,
            story_timeline: 0,
            foreshadow_state: 0,
            foreshadow_resolved_by: None,
            chapter_position: -1,
            text_length: 0,
            created_at: super::now_millis(),
        }
    }

    /// Text handed to the embedder: title carries topical signal, content carries detail.
    pub fn embeddable_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }
}

/// A fragment together with its similarity score from a semantic search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredFragment {
    pub fragment: MemoryFragment,
    pub score: f32,
}
