use serde::{Deserialize, Serialize};

use super::TimestampMillis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    Slow,
    Moderate,
    Fast,
    Varied,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotPointType {
    Revelation,
    Conflict,
    Resolution,
    Transition,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hook {
    pub content: String,
    pub strength: f32,
    pub position: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Foreshadow {
    pub content: String,
    /// "planted" or "resolved".
    pub kind: String,
    pub strength: f32,
    pub reference_chapter: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlotPoint {
    pub content: String,
    pub importance: f32,
    pub point_type: PlotPointType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterStateDelta {
    pub character_id: String,
    pub character_name: String,
    pub state_before: String,
    pub state_after: String,
    pub key_event: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmotionalBeat {
    pub tone: String,
    pub intensity: f32,
}

/// Structured analysis of one chapter (C9), derived from the generated prose plus
/// an LLM pass over it. One row per chapter; re-analyzing replaces the row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChapterAnalysis {
    pub id: String,
    pub project_id: String,
    pub chapter_id: String,
    pub plot_stage: String,
    pub conflict_level: u8,
    pub emotional_tone: String,
    pub emotional_intensity: f32,
    pub hooks: Vec<Hook>,
    pub foreshadows: Vec<Foreshadow>,
    pub plot_points: Vec<PlotPoint>,
    pub character_states: Vec<CharacterStateDelta>,
    pub pacing: Pacing,
    pub overall_quality_score: f32,
    pub pacing_score: f32,
    pub engagement_score: f32,
    pub coherence_score: f32,
    pub analysis_report: String,
    pub suggestions: Vec<String>,
    pub word_count: u32,
    pub dialogue_ratio: f32,
    pub description_ratio: f32,
    pub created_at: TimestampMillis,
}
