use serde::{Deserialize, Serialize};

/// Prose style knobs fed into the prompt composer (C7). A project carries one
/// `ProjectDefaultStyle`; individual generation requests may override fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WritingStyle {
    pub tone: String,
    pub pov: String,
    pub tense: String,
    pub pacing_preference: String,
    pub vocabulary_level: String,
    pub dialogue_density: f32,
    pub description_density: f32,
    pub sentence_length_preference: String,
}

impl Default for WritingStyle {
    fn default() -> Self {
        Self {
            tone: "neutral".to_string(),
            pov: "third_person".to_string(),
            tense: "past".to_string(),
            pacing_preference: "moderate".to_string(),
            vocabulary_level: "standard".to_string(),
            dialogue_density: 0.4,
            description_density: 0.4,
            sentence_length_preference: "varied".to_string(),
        }
    }
}

/// Per-project wrapper persisting the style a wizard run settled on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectDefaultStyle {
    pub project_id: String,
    pub style: WritingStyle,
}

impl ProjectDefaultStyle {
    pub fn new(project_id: impl Into<String>, style: WritingStyle) -> Self {
        Self {
            project_id: project_id.into(),
            style,
        }
    }
}
