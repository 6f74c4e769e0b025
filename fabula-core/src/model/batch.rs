use serde::{Deserialize, Serialize};

use super::TimestampMillis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

/// One chapter's worth of work submitted to the batch/retry controller (C6).
/// A batch request fans out into one of these per chapter_number.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchGenerationTask {
    pub id: String,
    pub batch_id: String,
    pub project_id: String,
    pub chapter_number: u32,
    pub status: TaskStatus,
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub result_chapter_id: Option<String>,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl BatchGenerationTask {
    pub fn new(
        id: impl Into<String>,
        batch_id: impl Into<String>,
        project_id: impl Into<String>,
        chapter_number: u32,
    ) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            batch_id: batch_id.into(),
            project_id: project_id.into(),
            chapter_number,
            status: TaskStatus::Queued,
            attempt: 0,
            max_attempts: 3,
            last_error: None,
            result_chapter_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single chapter analysis run (C9), tracked the same way a generation task is
/// so both can share the retry controller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisTask {
    pub id: String,
    pub project_id: String,
    pub chapter_id: String,
    pub status: TaskStatus,
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub result_analysis_id: Option<String>,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl AnalysisTask {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, chapter_id: impl Into<String>) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            chapter_id: chapter_id.into(),
            status: TaskStatus::Queued,
            attempt: 0,
            max_attempts: 3,
            last_error: None,
            result_analysis_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
