use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TimestampMillis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Draft,
    Revising,
    Final,
}

/// A generated or in-progress chapter. `sub_index` distinguishes multiple drafts
/// generated for the same `chapter_number` (regeneration keeps prior drafts around
/// rather than overwriting, per the original system's regeneration task model).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub project_id: String,
    pub chapter_number: u32,
    pub sub_index: u32,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub word_count: u32,
    pub status: ChapterStatus,
    pub outline_id: Option<String>,
    /// Free-form plan the chapter was expanded from (beats, target length, POV).
    pub expansion_plan: Option<Value>,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl Chapter {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, chapter_number: u32) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            chapter_number,
            sub_index: 1,
            title: String::new(),
            content: String::new(),
            summary: String::new(),
            word_count: 0,
            status: ChapterStatus::Draft,
            outline_id: None,
            expansion_plan: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_content(&mut self, content: String) {
        self.word_count = content.split_whitespace().count() as u32;
        self.content = content;
        self.updated_at = super::now_millis();
    }
}
