//! Per-tenant SQLite partition: one file holds every table for a tenant's projects.
//! Connections are opened per call via `spawn_blocking`, matching the pattern in
//! `memory::sqlite_fragment_store` rather than holding a single long-lived connection.

use std::future::Future;
use std::path::{Path, PathBuf};

use rusqlite::params;

use crate::memory::StoreError;
use crate::model::{
    AnalysisTask, BatchGenerationTask, Chapter, ChapterAnalysis, ChapterStatus,
    CharacterRelationship, Entity, EntityKind, MembershipStatus, NarrativePerspective,
    OrganizationMembership, OutlineNode, OutlineStatus, Project, ProjectDefaultStyle,
    ProjectStatus, RelationshipStatus, TaskStatus, ToolPlugin, WizardStep, WritingStyle,
};

/// Seed vocabulary for `CharacterRelationship::relationship_type`, translated from the
/// original system's relationship category list (family/social/hostile/professional).
pub const RELATIONSHIP_TYPE_VOCABULARY: &[&str] = &[
    "family", "friend", "rival", "mentor", "romantic", "ally", "enemy", "colleague",
];

fn project_status_str(s: ProjectStatus) -> &'static str {
    match s {
        ProjectStatus::Planning => "planning",
        ProjectStatus::Writing => "writing",
        ProjectStatus::Paused => "paused",
        ProjectStatus::Completed => "completed",
    }
}
fn project_status_from(s: &str) -> ProjectStatus {
    match s {
        "writing" => ProjectStatus::Writing,
        "paused" => ProjectStatus::Paused,
        "completed" => ProjectStatus::Completed,
        _ => ProjectStatus::Planning,
    }
}
fn wizard_step_str(s: WizardStep) -> &'static str {
    match s {
        WizardStep::Incomplete => "incomplete",
        WizardStep::World => "world",
        WizardStep::Characters => "characters",
        WizardStep::Outline => "outline",
        WizardStep::Done => "done",
    }
}
fn wizard_step_from(s: &str) -> WizardStep {
    match s {
        "world" => WizardStep::World,
        "characters" => WizardStep::Characters,
        "outline" => WizardStep::Outline,
        "done" => WizardStep::Done,
        _ => WizardStep::Incomplete,
    }
}
fn perspective_str(p: NarrativePerspective) -> &'static str {
    match p {
        NarrativePerspective::FirstPerson => "first_person",
        NarrativePerspective::ThirdPerson => "third_person",
        NarrativePerspective::Omniscient => "omniscient",
    }
}
fn perspective_from(s: &str) -> NarrativePerspective {
    match s {
        "first_person" => NarrativePerspective::FirstPerson,
        "omniscient" => NarrativePerspective::Omniscient,
        _ => NarrativePerspective::ThirdPerson,
    }
}
fn entity_kind_str(k: EntityKind) -> &'static str {
    match k {
        EntityKind::Character => "character",
        EntityKind::Organization => "organization",
    }
}
fn entity_kind_from(s: &str) -> EntityKind {
    match s {
        "organization" => EntityKind::Organization,
        _ => EntityKind::Character,
    }
}
fn relationship_status_str(s: RelationshipStatus) -> &'static str {
    match s {
        RelationshipStatus::Active => "active",
        RelationshipStatus::Broken => "broken",
        RelationshipStatus::Past => "past",
        RelationshipStatus::Complicated => "complicated",
    }
}
fn relationship_status_from(s: &str) -> RelationshipStatus {
    match s {
        "broken" => RelationshipStatus::Broken,
        "past" => RelationshipStatus::Past,
        "complicated" => RelationshipStatus::Complicated,
        _ => RelationshipStatus::Active,
    }
}
fn membership_status_str(s: MembershipStatus) -> &'static str {
    match s {
        MembershipStatus::Active => "active",
        MembershipStatus::Retired => "retired",
        MembershipStatus::Expelled => "expelled",
        MembershipStatus::Deceased => "deceased",
    }
}
fn membership_status_from(s: &str) -> MembershipStatus {
    match s {
        "retired" => MembershipStatus::Retired,
        "expelled" => MembershipStatus::Expelled,
        "deceased" => MembershipStatus::Deceased,
        _ => MembershipStatus::Active,
    }
}
fn outline_status_str(s: OutlineStatus) -> &'static str {
    match s {
        OutlineStatus::Planned => "planned",
        OutlineStatus::Drafted => "drafted",
        OutlineStatus::Locked => "locked",
    }
}
fn outline_status_from(s: &str) -> OutlineStatus {
    match s {
        "drafted" => OutlineStatus::Drafted,
        "locked" => OutlineStatus::Locked,
        _ => OutlineStatus::Planned,
    }
}
fn chapter_status_str(s: ChapterStatus) -> &'static str {
    match s {
        ChapterStatus::Draft => "draft",
        ChapterStatus::Revising => "revising",
        ChapterStatus::Final => "final",
    }
}
fn chapter_status_from(s: &str) -> ChapterStatus {
    match s {
        "revising" => ChapterStatus::Revising,
        "final" => ChapterStatus::Final,
        _ => ChapterStatus::Draft,
    }
}
fn task_status_str(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Queued => "queued",
        TaskStatus::Running => "running",
        TaskStatus::Succeeded => "succeeded",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}
fn task_status_from(s: &str) -> TaskStatus {
    match s {
        "running" => TaskStatus::Running,
        "succeeded" => TaskStatus::Succeeded,
        "failed" => TaskStatus::Failed,
        "cancelled" => TaskStatus::Cancelled,
        _ => TaskStatus::Queued,
    }
}

fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        theme: row.get("theme")?,
        genre: row.get("genre")?,
        target_words: row.get("target_words")?,
        current_words: row.get("current_words")?,
        status: project_status_from(&row.get::<_, String>("status")?),
        wizard_step: wizard_step_from(&row.get::<_, String>("wizard_step")?),
        world_time_period: row.get("world_time_period")?,
        world_location: row.get("world_location")?,
        world_atmosphere: row.get("world_atmosphere")?,
        world_rules: row.get("world_rules")?,
        chapter_count: row.get("chapter_count")?,
        narrative_perspective: perspective_from(&row.get::<_, String>("narrative_perspective")?),
        character_count: row.get("character_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<Entity> {
    let attrs: String = row.get("attributes")?;
    Ok(Entity {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        kind: entity_kind_from(&row.get::<_, String>("kind")?),
        name: row.get("name")?,
        description: row.get("description")?,
        attributes: serde_json::from_str(&attrs).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_relationship(row: &rusqlite::Row) -> rusqlite::Result<CharacterRelationship> {
    Ok(CharacterRelationship {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        character_from_id: row.get("character_from_id")?,
        character_to_id: row.get("character_to_id")?,
        relationship_type: row.get("relationship_type")?,
        relationship_name: row.get("relationship_name")?,
        intimacy_level: row.get("intimacy_level")?,
        status: relationship_status_from(&row.get::<_, String>("status")?),
        description: row.get("description")?,
        started_at: row.get("started_at")?,
        ended_at: row.get("ended_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_membership(row: &rusqlite::Row) -> rusqlite::Result<OrganizationMembership> {
    Ok(OrganizationMembership {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        character_id: row.get("character_id")?,
        organization_id: row.get("organization_id")?,
        position: row.get("position")?,
        rank: row.get("rank")?,
        loyalty: row.get("loyalty")?,
        status: membership_status_from(&row.get::<_, String>("status")?),
        joined_at: row.get("joined_at")?,
        left_at: row.get("left_at")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_outline_node(row: &rusqlite::Row) -> rusqlite::Result<OutlineNode> {
    Ok(OutlineNode {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        parent_id: row.get("parent_id")?,
        order_index: row.get("order_index")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        status: outline_status_from(&row.get::<_, String>("status")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_chapter(row: &rusqlite::Row) -> rusqlite::Result<Chapter> {
    let plan: Option<String> = row.get("expansion_plan")?;
    Ok(Chapter {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        chapter_number: row.get("chapter_number")?,
        sub_index: row.get("sub_index")?,
        title: row.get("title")?,
        content: row.get("content")?,
        summary: row.get("summary")?,
        word_count: row.get("word_count")?,
        status: chapter_status_from(&row.get::<_, String>("status")?),
        outline_id: row.get("outline_id")?,
        expansion_plan: plan.and_then(|p| serde_json::from_str(&p).ok()),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub struct TenantStore {
    db_path: PathBuf,
}

impl TenantStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path).map_err(|e| StoreError::Storage(e.to_string()))?;
        conn.execute_batch(SCHEMA).map_err(|e| StoreError::Storage(e.to_string()))?;
        let store = Self { db_path };
        store.seed_relationship_vocabulary_sync(&conn)?;
        store.seed_writing_style_presets_sync(&conn)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn with_conn<T, F>(&self, f: F) -> impl Future<Output = Result<T, StoreError>>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.db_path.clone();
        async move {
            tokio::task::spawn_blocking(move || {
                let conn = rusqlite::Connection::open(&path).map_err(|e| StoreError::Storage(e.to_string()))?;
                f(&conn)
            })
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?
        }
    }

    fn seed_relationship_vocabulary_sync(&self, conn: &rusqlite::Connection) -> Result<(), StoreError> {
        for term in RELATIONSHIP_TYPE_VOCABULARY {
            conn.execute(
                "INSERT OR IGNORE INTO relationship_type_vocabulary (term) VALUES (?1)",
                params![term],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    fn seed_writing_style_presets_sync(&self, conn: &rusqlite::Connection) -> Result<(), StoreError> {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM writing_style_presets", [], |r| r.get(0))
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        if count > 0 {
            return Ok(());
        }
        let presets = [
            ("literary", WritingStyle { tone: "literary".into(), ..WritingStyle::default() }),
            ("fast_paced", WritingStyle { tone: "fast_paced".into(), pacing_preference: "fast".into(), ..WritingStyle::default() }),
            ("whimsical", WritingStyle { tone: "whimsical".into(), vocabulary_level: "playful".into(), ..WritingStyle::default() }),
        ];
        for (name, style) in presets {
            let style_json = serde_json::to_string(&style)?;
            conn.execute(
                "INSERT OR IGNORE INTO writing_style_presets (name, style) VALUES (?1, ?2)",
                params![name, style_json],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn relationship_vocabulary(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT term FROM relationship_type_vocabulary ORDER BY term")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map([], |r| r.get(0))
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<String>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
    }

    /// The first seeded global style preset; the wizard assigns this as a new
    /// project's default style.
    pub async fn first_style_preset(&self) -> Result<WritingStyle, StoreError> {
        self.with_conn(|conn| {
            let style_json: String = conn
                .query_row("SELECT style FROM writing_style_presets ORDER BY name LIMIT 1", [], |r| r.get(0))
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            serde_json::from_str(&style_json).map_err(StoreError::from)
        })
        .await
    }

    pub async fn set_project_default_style(&self, style: ProjectDefaultStyle) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let style_json = serde_json::to_string(&style.style)?;
            conn.execute(
                "INSERT INTO project_default_styles (project_id, style) VALUES (?1, ?2)
                 ON CONFLICT(project_id) DO UPDATE SET style = excluded.style",
                params![style.project_id, style_json],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn get_project_default_style(&self, project_id: &str) -> Result<Option<ProjectDefaultStyle>, StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            let style_json: Option<String> = conn
                .query_row(
                    "SELECT style FROM project_default_styles WHERE project_id = ?1",
                    params![project_id],
                    |r| r.get(0),
                )
                .ok();
            Ok(match style_json {
                Some(s) => Some(ProjectDefaultStyle::new(project_id, serde_json::from_str(&s)?)),
                None => None,
            })
        })
        .await
    }

    pub async fn create_project(&self, project: Project) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                r#"INSERT INTO projects
                    (id, user_id, title, description, theme, genre, target_words, current_words,
                     status, wizard_step, world_time_period, world_location, world_atmosphere,
                     world_rules, chapter_count, narrative_perspective, character_count,
                     created_at, updated_at)
                   VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)"#,
                params![
                    project.id,
                    project.user_id,
                    project.title,
                    project.description,
                    project.theme,
                    project.genre,
                    project.target_words,
                    project.current_words,
                    project_status_str(project.status),
                    wizard_step_str(project.wizard_step),
                    project.world_time_period,
                    project.world_location,
                    project.world_atmosphere,
                    project.world_rules,
                    project.chapter_count,
                    perspective_str(project.narrative_perspective),
                    project.character_count,
                    project.created_at,
                    project.updated_at,
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn update_project(&self, project: Project) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    r#"UPDATE projects SET
                        title=?2, description=?3, theme=?4, genre=?5, target_words=?6,
                        current_words=?7, status=?8, wizard_step=?9, world_time_period=?10,
                        world_location=?11, world_atmosphere=?12, world_rules=?13,
                        chapter_count=?14, narrative_perspective=?15, character_count=?16,
                        updated_at=?17
                       WHERE id=?1"#,
                    params![
                        project.id,
                        project.title,
                        project.description,
                        project.theme,
                        project.genre,
                        project.target_words,
                        project.current_words,
                        project_status_str(project.status),
                        wizard_step_str(project.wizard_step),
                        project.world_time_period,
                        project.world_location,
                        project.world_atmosphere,
                        project.world_rules,
                        project.chapter_count,
                        perspective_str(project.narrative_perspective),
                        project.character_count,
                        project.updated_at,
                    ],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            if changed == 0 {
                return Err(StoreError::NotFound(project.id));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row("SELECT * FROM projects WHERE id = ?1", params![id], row_to_project)
                .map(Some)
                .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(StoreError::Storage(e.to_string())) })
        })
        .await
    }

    pub async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM projects WHERE user_id = ?1 ORDER BY created_at DESC")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt.query_map(params![user_id], row_to_project).map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
    }

    pub async fn create_entity(&self, entity: Entity) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let attrs = serde_json::to_string(&entity.attributes)?;
            conn.execute(
                "INSERT INTO entities (id, project_id, kind, name, description, attributes, created_at, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![entity.id, entity.project_id, entity_kind_str(entity.kind), entity.name, entity.description, attrs, entity.created_at, entity.updated_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn get_entity(&self, project_id: &str, id: &str) -> Result<Option<Entity>, StoreError> {
        let (project_id, id) = (project_id.to_string(), id.to_string());
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT * FROM entities WHERE id = ?1 AND project_id = ?2",
                params![id, project_id],
                row_to_entity,
            )
            .map(Some)
            .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(StoreError::Storage(e.to_string())) })
        })
        .await
    }

    pub async fn list_entities(&self, project_id: &str, kind: Option<EntityKind>) -> Result<Vec<Entity>, StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            let (sql, kind_str) = match kind {
                Some(k) => ("SELECT * FROM entities WHERE project_id = ?1 AND kind = ?2 ORDER BY created_at", Some(entity_kind_str(k).to_string())),
                None => ("SELECT * FROM entities WHERE project_id = ?1 ORDER BY created_at", None),
            };
            let mut stmt = conn.prepare(sql).map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = match &kind_str {
                Some(k) => stmt.query_map(params![project_id, k], row_to_entity),
                None => stmt.query_map(params![project_id, ""], row_to_entity),
            }
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
    }

    pub async fn create_relationship(&self, rel: CharacterRelationship) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                r#"INSERT INTO character_relationships
                    (id, project_id, character_from_id, character_to_id, relationship_type,
                     relationship_name, intimacy_level, status, description, started_at, ended_at,
                     created_at, updated_at)
                   VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)"#,
                params![
                    rel.id, rel.project_id, rel.character_from_id, rel.character_to_id,
                    rel.relationship_type, rel.relationship_name, rel.intimacy_level,
                    relationship_status_str(rel.status), rel.description, rel.started_at,
                    rel.ended_at, rel.created_at, rel.updated_at,
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn list_relationships(&self, project_id: &str) -> Result<Vec<CharacterRelationship>, StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM character_relationships WHERE project_id = ?1 ORDER BY created_at")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt.query_map(params![project_id], row_to_relationship).map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
    }

    pub async fn create_membership(&self, membership: OrganizationMembership) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO organization_memberships
                    (id, project_id, character_id, organization_id, position, rank, loyalty, status, joined_at, left_at, created_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
                params![
                    membership.id,
                    membership.project_id,
                    membership.character_id,
                    membership.organization_id,
                    membership.position,
                    membership.rank,
                    membership.loyalty,
                    membership_status_str(membership.status),
                    membership.joined_at,
                    membership.left_at,
                    membership.created_at,
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn list_memberships(&self, project_id: &str) -> Result<Vec<OrganizationMembership>, StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM organization_memberships WHERE project_id = ?1 ORDER BY created_at")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt.query_map(params![project_id], row_to_membership).map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
    }

    pub async fn create_outline_node(&self, node: OutlineNode) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                r#"INSERT INTO outline_nodes
                    (id, project_id, parent_id, order_index, title, summary, status, created_at, updated_at)
                   VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)"#,
                params![node.id, node.project_id, node.parent_id, node.order_index, node.title, node.summary, outline_status_str(node.status), node.created_at, node.updated_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn list_outline_nodes(&self, project_id: &str) -> Result<Vec<OutlineNode>, StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM outline_nodes WHERE project_id = ?1 ORDER BY order_index")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt.query_map(params![project_id], row_to_outline_node).map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
    }

    /// Batch reorder: `pairs` is `(outline_node_id, new_order_index)` for every node
    /// being moved. Applied in one transaction via a collect-then-commit strategy —
    /// every node is first parked at a negative, collision-free `order_index`, then
    /// moved to its final value — so a reorder that would otherwise pass through a
    /// state with two nodes sharing an `order_index` never does.
    pub async fn reorder_outline_nodes(&self, project_id: &str, pairs: Vec<(String, i64)>) -> Result<(), StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.unchecked_transaction().map_err(|e| StoreError::Storage(e.to_string()))?;
            for (offset, (id, _)) in pairs.iter().enumerate() {
                tx.execute(
                    "UPDATE outline_nodes SET order_index = ?1 WHERE id = ?2 AND project_id = ?3",
                    params![-(offset as i64) - 1, id, project_id],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            }
            for (id, new_index) in &pairs {
                let changed = tx
                    .execute(
                        "UPDATE outline_nodes SET order_index = ?1 WHERE id = ?2 AND project_id = ?3",
                        params![new_index, id, project_id],
                    )
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                if changed == 0 {
                    return Err(StoreError::NotFound(id.clone()));
                }
            }
            tx.commit().map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    /// Deletes every outline node and chapter for a project; used by outline-continue's
    /// `new` mode before regenerating the whole outline.
    pub async fn delete_outline_and_chapters(&self, project_id: &str) -> Result<(), StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM chapters WHERE project_id = ?1", params![project_id]).map_err(|e| StoreError::Storage(e.to_string()))?;
            conn.execute("DELETE FROM outline_nodes WHERE project_id = ?1", params![project_id]).map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn create_chapter(&self, chapter: Chapter) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let plan = chapter.expansion_plan.as_ref().map(serde_json::to_string).transpose()?;
            conn.execute(
                r#"INSERT INTO chapters
                    (id, project_id, chapter_number, sub_index, title, content, summary, word_count,
                     status, outline_id, expansion_plan, created_at, updated_at)
                   VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)"#,
                params![
                    chapter.id, chapter.project_id, chapter.chapter_number, chapter.sub_index,
                    chapter.title, chapter.content, chapter.summary, chapter.word_count,
                    chapter_status_str(chapter.status), chapter.outline_id, plan,
                    chapter.created_at, chapter.updated_at,
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn update_chapter(&self, chapter: Chapter) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let plan = chapter.expansion_plan.as_ref().map(serde_json::to_string).transpose()?;
            let changed = conn
                .execute(
                    r#"UPDATE chapters SET
                        title=?2, content=?3, summary=?4, word_count=?5, status=?6,
                        outline_id=?7, expansion_plan=?8, updated_at=?9
                       WHERE id=?1"#,
                    params![chapter.id, chapter.title, chapter.content, chapter.summary, chapter.word_count, chapter_status_str(chapter.status), chapter.outline_id, plan, chapter.updated_at],
                )
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            if changed == 0 {
                return Err(StoreError::NotFound(chapter.id));
            }
            Ok(())
        })
        .await
    }

    pub async fn get_chapter(&self, project_id: &str, id: &str) -> Result<Option<Chapter>, StoreError> {
        let (project_id, id) = (project_id.to_string(), id.to_string());
        self.with_conn(move |conn| {
            conn.query_row("SELECT * FROM chapters WHERE id = ?1 AND project_id = ?2", params![id, project_id], row_to_chapter)
                .map(Some)
                .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(StoreError::Storage(e.to_string())) })
        })
        .await
    }

    pub async fn get_chapter_by_number(&self, project_id: &str, chapter_number: u32) -> Result<Option<Chapter>, StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT * FROM chapters WHERE project_id = ?1 AND chapter_number = ?2 ORDER BY sub_index DESC LIMIT 1",
                params![project_id, chapter_number],
                row_to_chapter,
            )
            .map(Some)
            .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(StoreError::Storage(e.to_string())) })
        })
        .await
    }

    pub async fn list_chapters(&self, project_id: &str) -> Result<Vec<Chapter>, StoreError> {
        let project_id = project_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM chapters WHERE project_id = ?1 ORDER BY chapter_number, sub_index")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt.query_map(params![project_id], row_to_chapter).map_err(|e| StoreError::Storage(e.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(|e| StoreError::Storage(e.to_string()))
        })
        .await
    }

    pub async fn create_tool_plugin(&self, plugin: ToolPlugin) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let transport = serde_json::to_string(&plugin.transport)?;
            conn.execute(
                r#"INSERT INTO tool_plugins
                    (id, tenant_id, name, transport, enabled, max_retries, base_retry_delay_ms,
                     max_retry_delay_ms, call_timeout_ms, tool_cache_ttl_ms)
                   VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
                   ON CONFLICT(tenant_id, name) DO UPDATE SET transport = excluded.transport, enabled = excluded.enabled"#,
                params![
                    plugin.id, plugin.tenant_id, plugin.name, transport, plugin.enabled,
                    plugin.max_retries, plugin.base_retry_delay.as_millis() as i64,
                    plugin.max_retry_delay.as_millis() as i64, plugin.call_timeout.as_millis() as i64,
                    plugin.tool_cache_ttl.as_millis() as i64,
                ],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn list_tool_plugins(&self, tenant_id: &str) -> Result<Vec<ToolPlugin>, StoreError> {
        let tenant_id = tenant_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, tenant_id, name, transport, enabled, max_retries, base_retry_delay_ms, max_retry_delay_ms, call_timeout_ms, tool_cache_ttl_ms FROM tool_plugins WHERE tenant_id = ?1")
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(params![tenant_id], |row| {
                    let transport_json: String = row.get(3)?;
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, transport_json, row.get::<_, bool>(4)?, row.get::<_, u32>(5)?, row.get::<_, i64>(6)?, row.get::<_, i64>(7)?, row.get::<_, i64>(8)?, row.get::<_, i64>(9)?))
                })
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            let mut plugins = Vec::new();
            for row in rows {
                let (id, tenant_id, name, transport_json, enabled, max_retries, base_ms, max_ms, call_ms, cache_ms) = row.map_err(|e| StoreError::Storage(e.to_string()))?;
                plugins.push(ToolPlugin {
                    id,
                    tenant_id,
                    name,
                    transport: serde_json::from_str(&transport_json)?,
                    enabled,
                    max_retries,
                    base_retry_delay: std::time::Duration::from_millis(base_ms as u64),
                    max_retry_delay: std::time::Duration::from_millis(max_ms as u64),
                    call_timeout: std::time::Duration::from_millis(call_ms as u64),
                    tool_cache_ttl: std::time::Duration::from_millis(cache_ms as u64),
                });
            }
            Ok(plugins)
        })
        .await
    }

    pub async fn create_batch_task(&self, task: BatchGenerationTask) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                r#"INSERT INTO batch_generation_tasks
                    (id, batch_id, project_id, chapter_number, status, attempt, max_attempts,
                     last_error, result_chapter_id, created_at, updated_at)
                   VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)"#,
                params![task.id, task.batch_id, task.project_id, task.chapter_number, task_status_str(task.status), task.attempt, task.max_attempts, task.last_error, task.result_chapter_id, task.created_at, task.updated_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn update_batch_task(&self, task: BatchGenerationTask) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE batch_generation_tasks SET status=?2, attempt=?3, last_error=?4, result_chapter_id=?5, updated_at=?6 WHERE id=?1",
                params![task.id, task_status_str(task.status), task.attempt, task.last_error, task.result_chapter_id, task.updated_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn create_analysis_task(&self, task: AnalysisTask) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                r#"INSERT INTO analysis_tasks
                    (id, project_id, chapter_id, status, attempt, max_attempts, last_error,
                     result_analysis_id, created_at, updated_at)
                   VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)"#,
                params![task.id, task.project_id, task.chapter_id, task_status_str(task.status), task.attempt, task.max_attempts, task.last_error, task.result_analysis_id, task.created_at, task.updated_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn update_analysis_task(&self, task: AnalysisTask) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE analysis_tasks SET status=?2, attempt=?3, last_error=?4, result_analysis_id=?5, updated_at=?6 WHERE id=?1",
                params![task.id, task_status_str(task.status), task.attempt, task.last_error, task.result_analysis_id, task.updated_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn get_analysis_task(&self, id: &str) -> Result<Option<AnalysisTask>, StoreError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.query_row("SELECT * FROM analysis_tasks WHERE id = ?1", params![id], |row| {
                Ok(AnalysisTask {
                    id: row.get("id")?,
                    project_id: row.get("project_id")?,
                    chapter_id: row.get("chapter_id")?,
                    status: task_status_from(&row.get::<_, String>("status")?),
                    attempt: row.get("attempt")?,
                    max_attempts: row.get("max_attempts")?,
                    last_error: row.get("last_error")?,
                    result_analysis_id: row.get("result_analysis_id")?,
                    created_at: row.get("created_at")?,
                    updated_at: row.get("updated_at")?,
                })
            })
            .map(Some)
            .or_else(|e| if e == rusqlite::Error::QueryReturnedNoRows { Ok(None) } else { Err(StoreError::Storage(e.to_string())) })
        })
        .await
    }

    pub async fn upsert_chapter_analysis(&self, analysis: ChapterAnalysis) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let payload = serde_json::to_string(&analysis)?;
            conn.execute(
                "INSERT INTO chapter_analyses (id, project_id, chapter_id, payload, created_at) VALUES (?1,?2,?3,?4,?5)
                 ON CONFLICT(chapter_id) DO UPDATE SET payload = excluded.payload, id = excluded.id, created_at = excluded.created_at",
                params![analysis.id, analysis.project_id, analysis.chapter_id, payload, analysis.created_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }

    pub async fn get_chapter_analysis(&self, chapter_id: &str) -> Result<Option<ChapterAnalysis>, StoreError> {
        let chapter_id = chapter_id.to_string();
        self.with_conn(move |conn| {
            let payload: Option<String> = conn
                .query_row("SELECT payload FROM chapter_analyses WHERE chapter_id = ?1", params![chapter_id], |r| r.get(0))
                .ok();
            Ok(match payload {
                Some(p) => Some(serde_json::from_str(&p)?),
                None => None,
            })
        })
        .await
    }

    /// Appends a truncated record of one generation call (spec §4.8.1: prompt/content
    /// truncated to 500 chars). Append-only, no versioned rollback.
    pub async fn append_generation_history(&self, project_id: &str, chapter_id: &str, prompt_excerpt: &str, content_excerpt: &str, created_at: i64) -> Result<(), StoreError> {
        let (project_id, chapter_id, prompt_excerpt, content_excerpt) = (project_id.to_string(), chapter_id.to_string(), prompt_excerpt.to_string(), content_excerpt.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO generation_history (project_id, chapter_id, prompt_excerpt, content_excerpt, created_at) VALUES (?1,?2,?3,?4,?5)",
                params![project_id, chapter_id, prompt_excerpt, content_excerpt, created_at],
            )
            .map_err(|e| StoreError::Storage(e.to_string()))?;
            Ok(())
        })
        .await
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    theme TEXT NOT NULL DEFAULT '',
    genre TEXT NOT NULL DEFAULT '',
    target_words INTEGER NOT NULL DEFAULT 0,
    current_words INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'planning',
    wizard_step TEXT NOT NULL DEFAULT 'incomplete',
    world_time_period TEXT,
    world_location TEXT,
    world_atmosphere TEXT,
    world_rules TEXT,
    chapter_count INTEGER NOT NULL DEFAULT 0,
    narrative_perspective TEXT NOT NULL DEFAULT 'third_person',
    character_count INTEGER NOT NULL DEFAULT 5,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS entities (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    attributes TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entities_project ON entities(project_id);

CREATE TABLE IF NOT EXISTS character_relationships (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    character_from_id TEXT NOT NULL,
    character_to_id TEXT NOT NULL,
    relationship_type TEXT NOT NULL,
    relationship_name TEXT,
    intimacy_level INTEGER NOT NULL DEFAULT 50,
    status TEXT NOT NULL DEFAULT 'active',
    description TEXT NOT NULL DEFAULT '',
    started_at TEXT,
    ended_at TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_relationships_project ON character_relationships(project_id);

CREATE TABLE IF NOT EXISTS organization_memberships (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    character_id TEXT NOT NULL,
    organization_id TEXT NOT NULL,
    position TEXT NOT NULL DEFAULT '',
    rank INTEGER NOT NULL DEFAULT 0,
    loyalty INTEGER NOT NULL DEFAULT 50,
    status TEXT NOT NULL DEFAULT 'active',
    joined_at TEXT,
    left_at TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS outline_nodes (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    parent_id TEXT,
    order_index INTEGER NOT NULL DEFAULT 0,
    title TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'planned',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_outline_project ON outline_nodes(project_id);

CREATE TABLE IF NOT EXISTS chapters (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    chapter_number INTEGER NOT NULL,
    sub_index INTEGER NOT NULL DEFAULT 1,
    title TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    word_count INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'draft',
    outline_id TEXT,
    expansion_plan TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chapters_project ON chapters(project_id, chapter_number);

CREATE TABLE IF NOT EXISTS relationship_type_vocabulary (
    term TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS writing_style_presets (
    name TEXT PRIMARY KEY,
    style TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_default_styles (
    project_id TEXT PRIMARY KEY,
    style TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tool_plugins (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    transport TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    max_retries INTEGER NOT NULL DEFAULT 3,
    base_retry_delay_ms INTEGER NOT NULL DEFAULT 1000,
    max_retry_delay_ms INTEGER NOT NULL DEFAULT 10000,
    call_timeout_ms INTEGER NOT NULL DEFAULT 60000,
    tool_cache_ttl_ms INTEGER NOT NULL DEFAULT 300000,
    UNIQUE(tenant_id, name)
);

CREATE TABLE IF NOT EXISTS batch_generation_tasks (
    id TEXT PRIMARY KEY,
    batch_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    chapter_number INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    attempt INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL DEFAULT 3,
    last_error TEXT,
    result_chapter_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS analysis_tasks (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    chapter_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    attempt INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL DEFAULT 3,
    last_error TEXT,
    result_analysis_id TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chapter_analyses (
    id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    chapter_id TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS generation_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id TEXT NOT NULL,
    chapter_id TEXT NOT NULL,
    prompt_excerpt TEXT NOT NULL,
    content_excerpt TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> TenantStore {
        let path = std::env::temp_dir().join(format!("fabula-tenant-test-{}.db", uuid::Uuid::new_v4()));
        TenantStore::open(path).unwrap()
    }

    #[tokio::test]
    async fn seeds_relationship_vocabulary_and_style_presets() {
        let store = temp_store();
        let vocab = store.relationship_vocabulary().await.unwrap();
        assert_eq!(vocab.len(), RELATIONSHIP_TYPE_VOCABULARY.len());
        let preset = store.first_style_preset().await.unwrap();
        assert_eq!(preset.tone, "fast_paced");
    }

    #[tokio::test]
    async fn project_create_get_update_roundtrip() {
        let store = temp_store();
        let project = Project::new("p1", "u1", "Night Market");
        store.create_project(project.clone()).await.unwrap();
        let fetched = store.get_project("p1").await.unwrap().unwrap();
        assert_eq!(fetched.title, "Night Market");

        let mut updated = fetched;
        updated.status = ProjectStatus::Writing;
        updated.current_words = 1200;
        store.update_project(updated).await.unwrap();
        let refetched = store.get_project("p1").await.unwrap().unwrap();
        assert_eq!(refetched.status, ProjectStatus::Writing);
        assert_eq!(refetched.current_words, 1200);
    }

    #[tokio::test]
    async fn chapter_and_outline_roundtrip() {
        let store = temp_store();
        store.create_project(Project::new("p1", "u1", "title")).await.unwrap();
        let node = OutlineNode::new("o1", "p1", "opening");
        store.create_outline_node(node).await.unwrap();
        let mut chapter = Chapter::new("c1", "p1", 1);
        chapter.set_content("hello world".to_string());
        store.create_chapter(chapter).await.unwrap();

        let chapters = store.list_chapters("p1").await.unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].word_count, 2);

        store.delete_outline_and_chapters("p1").await.unwrap();
        assert!(store.list_chapters("p1").await.unwrap().is_empty());
        assert!(store.list_outline_nodes("p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reorder_outline_nodes_preserves_contiguous_indices() {
        let store = temp_store();
        store.create_project(Project::new("p1", "u1", "title")).await.unwrap();
        let titles = ["A", "B", "C", "D", "E"];
        let mut ids = Vec::new();
        for (i, title) in titles.iter().enumerate() {
            let mut node = OutlineNode::new(format!("o{}", i + 1), "p1", *title);
            node.order_index = i as i64 + 1;
            ids.push(node.id.clone());
            store.create_outline_node(node).await.unwrap();
        }

        // Reorder to C, A, E, B, D.
        let new_order = vec![
            (ids[2].clone(), 1),
            (ids[0].clone(), 2),
            (ids[4].clone(), 3),
            (ids[1].clone(), 4),
            (ids[3].clone(), 5),
        ];
        store.reorder_outline_nodes("p1", new_order).await.unwrap();

        let nodes = store.list_outline_nodes("p1").await.unwrap();
        let ordered_titles: Vec<&str> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(ordered_titles, vec!["C", "A", "E", "B", "D"]);
        let indices: Vec<i64> = nodes.iter().map(|n| n.order_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn entity_and_relationship_roundtrip() {
        let store = temp_store();
        store.create_project(Project::new("p1", "u1", "title")).await.unwrap();
        store.create_entity(Entity::character("e1", "p1", "Mira")).await.unwrap();
        store.create_entity(Entity::character("e2", "p1", "Tobias")).await.unwrap();
        store
            .create_relationship(CharacterRelationship::new("r1", "p1", "e1", "e2", "rival"))
            .await
            .unwrap();

        let entities = store.list_entities("p1", Some(EntityKind::Character)).await.unwrap();
        assert_eq!(entities.len(), 2);
        let rels = store.list_relationships("p1").await.unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relationship_type, "rival");
    }
}
