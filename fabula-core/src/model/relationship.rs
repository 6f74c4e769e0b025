use serde::{Deserialize, Serialize};

use super::TimestampMillis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Active,
    Broken,
    Past,
    Complicated,
}

/// Edge between two character entities. `relationship_type` is a free-text
/// category (family/social/hostile/professional in the seeded vocabulary) rather
/// than a foreign key, since tenants may extend the vocabulary per project.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterRelationship {
    pub id: String,
    pub project_id: String,
    pub character_from_id: String,
    pub character_to_id: String,
    pub relationship_type: String,
    /// Overrides the type's default label (e.g. "estranged sister" instead of "sister").
    pub relationship_name: Option<String>,
    /// -100..=100; sign and magnitude convey direction and closeness.
    pub intimacy_level: i32,
    pub status: RelationshipStatus,
    pub description: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: TimestampMillis,
    pub updated_at: TimestampMillis,
}

impl CharacterRelationship {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        let now = super::now_millis();
        Self {
            id: id.into(),
            project_id: project_id.into(),
            character_from_id: from.into(),
            character_to_id: to.into(),
            relationship_type: relationship_type.into(),
            relationship_name: None,
            intimacy_level: 50,
            status: RelationshipStatus::Active,
            description: String::new(),
            started_at: None,
            ended_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Retired,
    Expelled,
    Deceased,
}

/// A character's membership in an organization entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub id: String,
    pub project_id: String,
    pub character_id: String,
    pub organization_id: String,
    pub position: String,
    pub rank: i32,
    /// 0..=100.
    pub loyalty: i32,
    pub status: MembershipStatus,
    pub joined_at: Option<String>,
    pub left_at: Option<String>,
    pub created_at: TimestampMillis,
}

impl OrganizationMembership {
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        character_id: impl Into<String>,
        organization_id: impl Into<String>,
        position: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            character_id: character_id.into(),
            organization_id: organization_id.into(),
            position: position.into(),
            rank: 0,
            loyalty: 50,
            status: MembershipStatus::Active,
            joined_at: None,
            left_at: None,
            created_at: super::now_millis(),
        }
    }
}
