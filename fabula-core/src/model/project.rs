use serde::{Deserialize, Serialize};

use super::TimestampMillis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    Writing,
    Paused,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativePerspective {
    FirstPerson,
    ThirdPerson,
    Omniscient,
}

/// Which wizard stage a project has reached. The wizard moves strictly forward
/// (world -> characters -> outline); see `crate::orchestrators::wizard`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Incomplete,
    World,
    Characters,
    Outline,
    Done,
}

/// A novel-in-progress. One row per project; world-building fields are populated
/// incrementally by the wizard orchestrator (C8).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub theme: String,
    pub genre: String,
    pub target_words: u32,
    pub current_words: u32,
    pub status: ProjectStatus,
    pub wizard_step: WizardStep,
    pub world_time_period: Option<String>,
    pub world_location: Option<String>,
    pub world_atmosphere: Option<String>,
    pub world_rules: Option<String>,
    pub chapter_count: u32,
    pub narrative_perspective: NarrativePerspective,
    pub character_count: u32,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl Project {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            description: String::new(),
            theme: String::new(),
            genre: String::new(),
            target_words: 0,
            current_words: 0,
            status: ProjectStatus::Planning,
            wizard_step: WizardStep::Incomplete,
            world_time_period: None,
            world_location: None,
            world_atmosphere: None,
            world_rules: None,
            chapter_count: 0,
            narrative_perspective: NarrativePerspective::ThirdPerson,
            character_count: 5,
            created_at: now,
            updated_at: now,
        }
    }
}
