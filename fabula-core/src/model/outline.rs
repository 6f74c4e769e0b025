use serde::{Deserialize, Serialize};

use super::TimestampMillis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineStatus {
    Planned,
    Drafted,
    Locked,
}

/// One node in a project's outline tree. `parent_id` is `None` for top-level arcs;
/// `order_index` is sibling order under the same parent. A chapter may reference
/// one outline node (`Chapter::outline_id`) as the plan it was generated from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutlineNode {
    pub id: String,
    pub project_id: String,
    pub parent_id: Option<String>,
    pub order_index: u32,
    pub title: String,
    pub summary: String,
    pub status: OutlineStatus,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl OutlineNode {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            parent_id: None,
            order_index: 0,
            title: title.into(),
            summary: String::new(),
            status: OutlineStatus::Planned,
            created_at: now,
            updated_at: now,
        }
    }
}
