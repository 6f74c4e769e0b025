use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TimestampMillis;

/// Character and organization entities share a table in the original system
/// (distinguished by `kind`); kept unified here since both participate in the
/// same relationship graph (`CharacterRelationship`, `OrganizationMembership`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Character,
    Organization,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub project_id: String,
    pub kind: EntityKind,
    pub name: String,
    pub description: String,
    /// Free-form attributes (age, appearance, founding year, ...); shape differs
    /// by `kind` so it is kept as JSON rather than a fixed column set.
    pub attributes: Value,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl Entity {
    pub fn character(id: impl Into<String>, project_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            kind: EntityKind::Character,
            name: name.into(),
            description: String::new(),
            attributes: Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn organization(id: impl Into<String>, project_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            kind: EntityKind::Organization,
            name: name.into(),
            description: String::new(),
            attributes: Value::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }
}
