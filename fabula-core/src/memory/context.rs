//! `build_context` (§4.3): a read-only aggregate of five slices used to compose
//! the chapter-generation prompt. Composing at call time (rather than storing a
//! pre-built context) keeps memory fresh across concurrent writes.

use crate::model::{Chapter, MemoryFragment, MemoryType, ScoredFragment};

use super::{MemoryStore, StoreError};

pub const DEFAULT_RECENT_CHAPTERS: usize = 3;
pub const DEFAULT_TOP_K: u32 = 5;
const RECENT_SUMMARY_CHARS: usize = 200;

/// One slice of the bundle: its rendered text plus the count/length stats the
/// spec requires each slice to emit.
#[derive(Clone, Debug, Default)]
pub struct ContextSlice {
    pub text: String,
    pub item_count: usize,
    pub char_len: usize,
}

impl ContextSlice {
    fn from_parts(parts: Vec<String>, join_with: &str) -> Self {
        let text = parts.join(join_with);
        Self {
            char_len: text.chars().count(),
            item_count: parts.len(),
            text,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryContextBundle {
    pub recent_context: ContextSlice,
    pub relevant_memories: ContextSlice,
    pub foreshadows: ContextSlice,
    pub character_states: ContextSlice,
    pub plot_points: ContextSlice,
}

/// Builds the five-slice memory context for generating `current_chapter`.
/// `prior_chapters` must already be filtered/ordered to chapters before
/// `current_chapter` (ascending by `chapter_number`); this function does not
/// query the relational store itself, so callers can use whichever store handle
/// they already hold.
pub async fn build_context(
    memory: &dyn MemoryStore,
    project_id: &str,
    current_chapter: u32,
    prior_chapters: &[Chapter],
    chapter_outline: &str,
    character_names: Option<&[String]>,
    recent_n: usize,
    top_k: u32,
) -> Result<MemoryContextBundle, StoreError> {
    let recent_context = recent_context_slice(prior_chapters, recent_n);
    let relevant_memories = relevant_memories_slice(memory, project_id, chapter_outline, current_chapter, top_k).await?;
    let foreshadows = foreshadows_slice(memory, project_id).await?;
    let character_states = character_states_slice(memory, project_id, character_names).await?;
    let plot_points = plot_points_slice(memory, project_id, prior_chapters, top_k).await?;

    Ok(MemoryContextBundle {
        recent_context,
        relevant_memories,
        foreshadows,
        character_states,
        plot_points,
    })
}

fn recent_context_slice(prior_chapters: &[Chapter], recent_n: usize) -> ContextSlice {
    let take_from = prior_chapters.len().saturating_sub(recent_n);
    let window = &prior_chapters[take_from..];
    let mut parts = Vec::new();
    for (i, chapter) in window.iter().enumerate() {
        let is_last_two = i + 2 >= window.len();
        let body = if is_last_two {
            chapter.content.clone()
        } else if !chapter.summary.is_empty() {
            truncate_chars(&chapter.summary, RECENT_SUMMARY_CHARS)
        } else {
            truncate_chars(&chapter.content, RECENT_SUMMARY_CHARS)
        };
        parts.push(format!("第{}章：{}", chapter.chapter_number, body));
    }
    ContextSlice::from_parts(parts, "\n\n")
}

async fn relevant_memories_slice(
    memory: &dyn MemoryStore,
    project_id: &str,
    chapter_outline: &str,
    current_chapter: u32,
    top_k: u32,
) -> Result<ContextSlice, StoreError> {
    let hits: Vec<ScoredFragment> = memory
        .search(project_id, chapter_outline, top_k * 2)
        .await?
        .into_iter()
        .filter(|hit| (hit.fragment.story_timeline as i64) < current_chapter as i64)
        .take(top_k as usize)
        .collect();
    let parts = hits.into_iter().map(|h| format!("{}（相关度 {:.2}）", h.fragment.content, h.score)).collect();
    Ok(ContextSlice::from_parts(parts, "\n"))
}

async fn foreshadows_slice(memory: &dyn MemoryStore, project_id: &str) -> Result<ContextSlice, StoreError> {
    let fragments = memory.unresolved_foreshadows(project_id).await?;
    let parts = fragments
        .into_iter()
        .map(|f| format!("第{}章埋下的伏笔：{}", f.story_timeline, f.content))
        .collect();
    Ok(ContextSlice::from_parts(parts, "\n"))
}

async fn character_states_slice(
    memory: &dyn MemoryStore,
    project_id: &str,
    character_names: Option<&[String]>,
) -> Result<ContextSlice, StoreError> {
    let names = match character_names {
        Some(n) if !n.is_empty() => n,
        _ => return Ok(ContextSlice::default()),
    };

    let mut latest_per_character: Vec<MemoryFragment> = Vec::new();
    let all = memory.list(project_id, Some(MemoryType::CharacterEvent), 10_000, 0).await?;
    for name in names {
        if let Some(latest) = all
            .iter()
            .filter(|f| f.related_characters.iter().any(|c| c == name))
            .max_by_key(|f| f.story_timeline)
        {
            latest_per_character.push(latest.clone());
        }
    }
    let parts = latest_per_character.into_iter().map(|f| format!("{}：{}", f.title, f.content)).collect();
    Ok(ContextSlice::from_parts(parts, "\n"))
}

async fn plot_points_slice(
    memory: &dyn MemoryStore,
    project_id: &str,
    prior_chapters: &[Chapter],
    top_k: u32,
) -> Result<ContextSlice, StoreError> {
    const RECENT_M_CHAPTERS: usize = 5;
    let cutoff = prior_chapters
        .iter()
        .rev()
        .take(RECENT_M_CHAPTERS)
        .map(|c| c.chapter_number as i64)
        .min()
        .unwrap_or(0);

    let mut points = memory.list(project_id, Some(MemoryType::PlotPoint), 10_000, 0).await?;
    points.retain(|p| p.story_timeline >= cutoff);
    points.sort_by(|a, b| b.importance_score.partial_cmp(&a.importance_score).unwrap_or(std::cmp::Ordering::Equal));
    points.truncate(top_k as usize);

    let parts = points.into_iter().map(|p| p.content).collect();
    Ok(ContextSlice::from_parts(parts, "\n"))
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMemoryStore;
    use crate::model::ChapterStatus;

    fn chapter(number: u32, content: &str) -> Chapter {
        let mut c = Chapter::new(format!("c{number}"), "p1", number);
        c.set_content(content.to_string());
        c.status = ChapterStatus::Final;
        c
    }

    #[tokio::test]
    async fn recent_context_keeps_full_text_for_last_two_and_summaries_earlier() {
        let chapters = vec![chapter(1, "one"), chapter(2, "two"), chapter(3, "three")];
        let slice = recent_context_slice(&chapters, 3);
        assert_eq!(slice.item_count, 3);
        assert!(slice.text.contains("two"));
        assert!(slice.text.contains("three"));
    }

    #[tokio::test]
    async fn foreshadows_slice_lists_unresolved_only() {
        let store = InMemoryMemoryStore::default();
        let mut planted = MemoryFragment::new("f1", "p1", MemoryType::Foreshadow, "a gun on the wall", "mentioned once");
        planted.foreshadow_state = 1;
        planted.story_timeline = 2;
        store.put(planted).await.unwrap();

        let mut resolved = MemoryFragment::new("f2", "p1", MemoryType::Foreshadow, "resolved thread", "paid off");
        resolved.foreshadow_state = 2;
        store.put(resolved).await.unwrap();

        let slice = foreshadows_slice(&store, "p1").await.unwrap();
        assert_eq!(slice.item_count, 1);
        assert!(slice.text.contains("a gun on the wall"));
    }

    #[tokio::test]
    async fn relevant_memories_slice_excludes_future_chapters() {
        let store = InMemoryMemoryStore::default();
        let mut early = MemoryFragment::new("f1", "p1", MemoryType::PlotPoint, "early beat", "the hero leaves home");
        early.story_timeline = 1;
        store.put(early).await.unwrap();
        let mut later = MemoryFragment::new("f2", "p1", MemoryType::PlotPoint, "later beat", "the hero returns home");
        later.story_timeline = 9;
        store.put(later).await.unwrap();

        let slice = relevant_memories_slice(&store, "p1", "home", 5, 10).await.unwrap();
        assert_eq!(slice.item_count, 1);
        assert!(slice.text.contains("leaves home"));
    }
}
