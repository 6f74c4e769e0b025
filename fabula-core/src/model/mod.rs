//! Data model (spec §3): the entities a tenant's SQLite partition stores.
//!
//! Field names and enumerations follow the original system's models
//! (`Project`, `Chapter`, `CharacterRelationship`, `StoryMemory`, `PlotAnalysis`, ...),
//! translated to snake_case Rust structs with serde derives so the same shape
//! serializes directly into HTTP responses and SSE `result` payloads.

mod analysis;
mod batch;
mod chapter;
mod entity;
mod memory_fragment;
mod outline;
mod project;
mod relationship;
mod style;
mod tenant;
mod tool_plugin;

pub use analysis::{
    CharacterStateDelta, ChapterAnalysis, EmotionalBeat, Foreshadow, Hook, Pacing, PlotPoint,
    PlotPointType,
};
pub use batch::{AnalysisTask, BatchGenerationTask, TaskStatus};
pub use chapter::{Chapter, ChapterStatus};
pub use entity::{Entity, EntityKind};
pub use memory_fragment::{MemoryFragment, MemoryType, ScoredFragment};
pub use outline::{OutlineNode, OutlineStatus};
pub use project::{NarrativePerspective, Project, ProjectStatus, WizardStep};
pub use relationship::{CharacterRelationship, MembershipStatus, OrganizationMembership, RelationshipStatus};
pub use style::{ProjectDefaultStyle, WritingStyle};
pub use tenant::Tenant;
pub use tool_plugin::{ToolPlugin, ToolTransport};

use serde::{Deserialize, Serialize};

/// Timestamp stored and transmitted as Unix millis; matches how
/// `memory::sqlite_fragment_store` represents `SystemTime` at rest.
pub type TimestampMillis = i64;

pub fn now_millis() -> TimestampMillis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Shared pagination request for list endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}
