//! Wizard (§4.8.3): the three-stage guided project setup. World -> Characters ->
//! Outline, each stage strictly after the last (`WizardStep` only moves forward).

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;

use crate::error::OrchestratorError;
use crate::llm::Message;
use crate::model::{
    Chapter, CharacterRelationship, Entity, OrganizationMembership, Project, ProjectDefaultStyle, WizardStep,
};
use crate::retry::{self, BatchError};
use crate::stream::EventEmitter;

use super::OrchestratorContext;

const CHARACTER_BATCH_SIZE: u32 = 3;
const CHARACTER_MAX_RETRIES: u32 = 3;
const OUTLINE_CHAPTER_COUNT: u32 = 5;
const OUTLINE_BATCH_SIZE: u32 = 5;

pub struct WizardWorldRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub title: String,
    pub theme: Option<String>,
    pub genre: Option<String>,
}

pub struct WizardCharactersRequest {
    pub tenant_id: String,
    pub project_id: String,
    pub count: u32,
}

pub struct WizardOutlineRequest {
    pub tenant_id: String,
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
struct RawWorld {
    time_period: String,
    location: String,
    atmosphere: String,
    rules: String,
}

#[derive(Debug, Deserialize, Clone)]
struct RawRelationship {
    to: String,
    relationship_type: String,
}

#[derive(Debug, Deserialize, Clone)]
struct RawMembership {
    organization: String,
    #[serde(default)]
    position: String,
}

#[derive(Debug, Deserialize, Clone)]
struct RawCharacter {
    name: String,
    description: String,
    #[serde(default)]
    is_organization: bool,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
    #[serde(default)]
    organization_memberships: Vec<RawMembership>,
}

#[derive(Debug, Deserialize)]
struct RawOutlineItem {
    title: String,
    summary: String,
}

/// Stage W1: derive the four world fields, create the project, assign the first
/// global writing-style preset as its default.
pub async fn run_wizard_world(
    ctx: &OrchestratorContext,
    request: WizardWorldRequest,
    emitter: &EventEmitter,
) -> Result<serde_json::Value, OrchestratorError> {
    let handle = ctx.registry.acquire(&request.tenant_id).await.map_err(|e| OrchestratorError::Internal(e.to_string()))?;

    emitter.progress("generating world", 10).await;
    let prompt = ctx.composer.world(&request.title, request.theme.as_deref(), request.genre.as_deref());
    let response = ctx.llm.invoke(&[Message::user(prompt)]).await.map_err(OrchestratorError::from)?;
    let cleaned = retry::strip_json_fences(&response.content);
    let world: RawWorld = serde_json::from_str(&cleaned).map_err(|e| OrchestratorError::LlmInvalidResponse(e.to_string()))?;

    let guard = handle.write_lock().await;

    let mut project = Project::new(uuid::Uuid::new_v4().to_string(), &request.user_id, &request.title);
    project.theme = request.theme.unwrap_or_default();
    project.genre = request.genre.unwrap_or_default();
    project.world_time_period = Some(world.time_period);
    project.world_location = Some(world.location);
    project.world_atmosphere = Some(world.atmosphere);
    project.world_rules = Some(world.rules);
    project.wizard_step = WizardStep::World;
    handle.store.create_project(project.clone()).await?;

    let default_style = handle.store.first_style_preset().await?;
    handle
        .store
        .set_project_default_style(ProjectDefaultStyle::new(project.id.clone(), default_style))
        .await?;

    drop(guard);

    emitter.progress("world complete", 100).await;
    let payload = json!({
        "project_id": project.id,
        "world_fields": {
            "time_period": project.world_time_period,
            "location": project.world_location,
            "atmosphere": project.world_atmosphere,
            "rules": project.world_rules,
        },
    });
    emitter.result(payload.clone()).await;
    emitter.done().await;
    Ok(payload)
}

/// Stage W2: generate `count` characters in batches, persist in two phases so
/// relationship/membership edges can only reference entities already created.
pub async fn run_wizard_characters(
    ctx: &OrchestratorContext,
    request: WizardCharactersRequest,
    emitter: &EventEmitter,
) -> Result<serde_json::Value, OrchestratorError> {
    let handle = ctx.registry.acquire(&request.tenant_id).await.map_err(|e| OrchestratorError::Internal(e.to_string()))?;
    let mut project = handle
        .store
        .get_project(&request.project_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("project {}", request.project_id)))?;
    if project.wizard_step < WizardStep::World {
        return Err(OrchestratorError::Validation("world stage not completed".to_string()));
    }

    let world_summary = project.world_atmosphere.clone();
    let existing_entities = handle.store.list_entities(&request.project_id, None).await?;
    let mut existing_names: Vec<String> = existing_entities.iter().map(|e| e.name.clone()).collect();

    let guard = handle.write_lock().await;

    let batches = retry::partition(request.count, CHARACTER_BATCH_SIZE);
    let mut all_raw: Vec<RawCharacter> = Vec::new();

    for batch_size in batches {
        let names_for_prompt = existing_names.clone();
        let items: Vec<RawCharacter> = retry::run_batch_with_retry(
            batch_size,
            CHARACTER_MAX_RETRIES,
            |attempt| {
                let prompt = ctx.composer.characters_batch(&project.title, world_summary.as_deref(), &names_for_prompt, batch_size, attempt);
                call_character_llm(ctx, prompt)
            },
            |items: &[RawCharacter]| if items.is_empty() { Err("empty batch".to_string()) } else { Ok(()) },
        )
        .await
        .map_err(batch_error_to_orchestrator)?;

        for item in &items {
            existing_names.push(item.name.clone());
        }
        all_raw.extend(items);
    }

    // Phase one: create every character/organization row so relationship edges
    // below can resolve both ends within this batch.
    let mut name_to_id: HashMap<String, String> = HashMap::new();
    let mut org_count = 0u32;
    for raw in &all_raw {
        let id = uuid::Uuid::new_v4().to_string();
        let entity = if raw.is_organization {
            org_count += 1;
            let mut e = Entity::organization(id.clone(), &request.project_id, raw.name.clone());
            e.description = raw.description.clone();
            e
        } else {
            let mut e = Entity::character(id.clone(), &request.project_id, raw.name.clone());
            e.description = raw.description.clone();
            e
        };
        handle.store.create_entity(entity).await?;
        name_to_id.insert(raw.name.clone(), id);
    }

    // Phase two: relationship and membership edges, dropping any reference to a
    // name outside this batch (AI-hallucination filter).
    let mut created_edges = 0u32;
    for raw in &all_raw {
        let Some(from_id) = name_to_id.get(&raw.name).cloned() else { continue };
        for rel in &raw.relationships {
            if let Some(to_id) = name_to_id.get(&rel.to) {
                let edge = CharacterRelationship::new(
                    uuid::Uuid::new_v4().to_string(),
                    &request.project_id,
                    from_id.clone(),
                    to_id.clone(),
                    rel.relationship_type.clone(),
                );
                handle.store.create_relationship(edge).await?;
                created_edges += 1;
            }
        }
        for membership in &raw.organization_memberships {
            if let Some(org_id) = name_to_id.get(&membership.organization) {
                let edge = OrganizationMembership::new(
                    uuid::Uuid::new_v4().to_string(),
                    &request.project_id,
                    from_id.clone(),
                    org_id.clone(),
                    membership.position.clone(),
                );
                handle.store.create_membership(edge).await?;
                created_edges += 1;
            }
        }
    }

    project.character_count = existing_entities.len() as u32 + all_raw.len() as u32 - org_count;
    project.wizard_step = WizardStep::Characters;
    handle.store.update_project(project.clone()).await?;

    drop(guard);

    emitter.progress("characters complete", 100).await;
    let payload = json!({
        "count": all_raw.len(),
        "organization_count": org_count,
        "created_edges": created_edges,
        "characters": all_raw.iter().map(|r| json!({"name": r.name, "is_organization": r.is_organization})).collect::<Vec<_>>(),
    });
    emitter.result(payload.clone()).await;
    emitter.done().await;
    Ok(payload)
}

/// Stage W3: a fixed 5-chapter opening outline, paired with draft chapters, then
/// marks the project wizard-complete.
pub async fn run_wizard_outline(
    ctx: &OrchestratorContext,
    request: WizardOutlineRequest,
    emitter: &EventEmitter,
) -> Result<serde_json::Value, OrchestratorError> {
    let handle = ctx.registry.acquire(&request.tenant_id).await.map_err(|e| OrchestratorError::Internal(e.to_string()))?;
    let mut project = handle
        .store
        .get_project(&request.project_id)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(format!("project {}", request.project_id)))?;
    if project.wizard_step < WizardStep::Characters {
        return Err(OrchestratorError::Validation("characters stage not completed".to_string()));
    }

    let guard = handle.write_lock().await;

    let batches = retry::partition(OUTLINE_CHAPTER_COUNT, OUTLINE_BATCH_SIZE);
    let mut order_index = 1u32;
    let mut created = Vec::new();

    for batch_size in batches {
        let items: Vec<RawOutlineItem> = retry::run_batch_with_retry(
            batch_size,
            retry::DEFAULT_MAX_RETRIES,
            |attempt| {
                let prompt = ctx.composer.outline_complete(&project.title, None, batch_size, attempt);
                call_outline_llm(ctx, prompt)
            },
            |items: &[RawOutlineItem]| if items.is_empty() { Err("empty batch".to_string()) } else { Ok(()) },
        )
        .await
        .map_err(batch_error_to_orchestrator)?;

        for item in items {
            let mut node = crate::model::OutlineNode::new(uuid::Uuid::new_v4().to_string(), &request.project_id, item.title.clone());
            node.order_index = order_index;
            node.summary = item.summary.clone();
            handle.store.create_outline_node(node.clone()).await?;

            let mut chapter = Chapter::new(uuid::Uuid::new_v4().to_string(), &request.project_id, order_index);
            chapter.title = item.title;
            chapter.summary = item.summary;
            chapter.outline_id = Some(node.id.clone());
            handle.store.create_chapter(chapter).await?;

            created.push(node);
            order_index += 1;
        }
    }

    project.wizard_step = WizardStep::Done;
    handle.store.update_project(project).await?;

    drop(guard);

    emitter.progress("outline complete", 100).await;
    let payload = json!({
        "count": created.len(),
        "outlines": created.iter().map(|n| json!({"id": n.id, "title": n.title})).collect::<Vec<_>>(),
    });
    emitter.result(payload.clone()).await;
    emitter.done().await;
    Ok(payload)
}

/// Deletes a project and everything it owns. Not streaming; returns deleted counts.
pub async fn run_wizard_cleanup(ctx: &OrchestratorContext, tenant_id: &str, project_id: &str) -> Result<serde_json::Value, OrchestratorError> {
    let handle = ctx.registry.acquire(tenant_id).await.map_err(|e| OrchestratorError::Internal(e.to_string()))?;
    let guard = handle.write_lock().await;

    let chapters = handle.store.list_chapters(project_id).await?.len();
    let outlines = handle.store.list_outline_nodes(project_id).await?.len();
    handle.store.delete_outline_and_chapters(project_id).await?;

    drop(guard);
    Ok(json!({"deleted_chapters": chapters, "deleted_outlines": outlines}))
}

async fn call_character_llm(ctx: &OrchestratorContext, prompt: String) -> Result<Vec<RawCharacter>, BatchError> {
    let response = ctx.llm.invoke(&[Message::user(prompt)]).await.map_err(|e| BatchError::InvalidResponse(e.to_string()))?;
    let cleaned = retry::strip_json_fences(&response.content);
    serde_json::from_str(&cleaned).map_err(|e| BatchError::InvalidResponse(e.to_string()))
}

async fn call_outline_llm(ctx: &OrchestratorContext, prompt: String) -> Result<Vec<RawOutlineItem>, BatchError> {
    let response = ctx.llm.invoke(&[Message::user(prompt)]).await.map_err(|e| BatchError::InvalidResponse(e.to_string()))?;
    let cleaned = retry::strip_json_fences(&response.content);
    serde_json::from_str(&cleaned).map_err(|e| BatchError::InvalidResponse(e.to_string()))
}

fn batch_error_to_orchestrator(e: BatchError) -> OrchestratorError {
    match e {
        BatchError::InvalidResponse(msg) => OrchestratorError::LlmInvalidResponse(msg),
        BatchError::ExhaustedRetries(attempts, msg) => {
            OrchestratorError::LlmInvalidResponse(format!("failed after {attempts} attempts: {msg}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::tenant::TenantRegistry;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("fabula-wiz-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn world_stage_creates_project_with_default_style() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let reply = r#"{"time_period": "近未来", "location": "海边小镇", "atmosphere": "忧郁", "rules": "无魔法"}"#;
        let ctx = OrchestratorContext::new(registry.clone(), Arc::new(MockLlm::fixed(reply)));
        let (tx, _rx) = mpsc::channel(16);
        let emitter = EventEmitter::new(tx);

        let request = WizardWorldRequest {
            tenant_id: "tenant-a".into(),
            user_id: "user-1".into(),
            title: "Night Market".into(),
            theme: None,
            genre: None,
        };
        let result = run_wizard_world(&ctx, request, &emitter).await.unwrap();
        let project_id = result["project_id"].as_str().unwrap().to_string();

        let handle = registry.acquire("tenant-a").await.unwrap();
        let project = handle.store.get_project(&project_id).await.unwrap().unwrap();
        assert_eq!(project.wizard_step, WizardStep::World);
        assert!(handle.store.get_project_default_style(&project_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn characters_stage_drops_hallucinated_references() {
        let registry = Arc::new(TenantRegistry::new(temp_dir(), None));
        let handle = registry.acquire("tenant-a").await.unwrap();
        let mut project = Project::new("p1", "user-1", "Night Market");
        project.wizard_step = WizardStep::World;
        handle.store.create_project(project).await.unwrap();

        let reply = r#"[
            {"name": "Aria", "description": "a wanderer", "relationships": [{"to": "Ghost Captain", "relationship_type": "rival"}]},
            {"name": "Bren", "description": "a smith", "relationships": []}
        ]"#;
        let ctx = OrchestratorContext::new(registry.clone(), Arc::new(MockLlm::fixed(reply)));
        let (tx, _rx) = mpsc::channel(16);
        let emitter = EventEmitter::new(tx);

        let request = WizardCharactersRequest {
            tenant_id: "tenant-a".into(),
            project_id: "p1".into(),
            count: 2,
        };
        let result = run_wizard_characters(&ctx, request, &emitter).await.unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(result["created_edges"], 0);

        let rels = handle.store.list_relationships("p1").await.unwrap();
        assert!(rels.is_empty());
    }
}
