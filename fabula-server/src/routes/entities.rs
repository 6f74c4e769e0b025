//! Character/organization entity and relationship CRUD (spec §6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use fabula_core::model::{CharacterRelationship, Entity, EntityKind};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::tenant_id::TenantId;

use super::acquire;

#[derive(Deserialize)]
pub struct CreateEntityRequest {
    pub name: String,
    #[serde(default)]
    pub is_organization: bool,
    #[serde(default)]
    pub description: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
    Json(req): Json<CreateEntityRequest>,
) -> Result<Json<Entity>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let id = uuid::Uuid::new_v4().to_string();
    let mut entity = if req.is_organization {
        Entity::organization(id, &project_id, req.name)
    } else {
        Entity::character(id, &project_id, req.name)
    };
    entity.description = req.description;
    handle.store.create_entity(entity.clone()).await?;
    Ok(Json(entity))
}

#[derive(Deserialize)]
pub struct ListEntitiesQuery {
    pub kind: Option<EntityKind>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
    Query(q): Query<ListEntitiesQuery>,
) -> Result<Json<Vec<Entity>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let entities = handle.store.list_entities(&project_id, q.kind).await?;
    Ok(Json(entities))
}

#[derive(Deserialize)]
pub struct CreateRelationshipRequest {
    pub character_from_id: String,
    pub character_to_id: String,
    pub relationship_type: String,
}

pub async fn create_relationship(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
    Json(req): Json<CreateRelationshipRequest>,
) -> Result<Json<CharacterRelationship>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let rel = CharacterRelationship::new(
        uuid::Uuid::new_v4().to_string(),
        &project_id,
        req.character_from_id,
        req.character_to_id,
        req.relationship_type,
    );
    handle.store.create_relationship(rel.clone()).await?;
    Ok(Json(rel))
}

pub async fn list_relationships(
    State(state): State<Arc<AppState>>,
    TenantId(tenant_id): TenantId,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<CharacterRelationship>>, ApiError> {
    let handle = acquire(&state, &tenant_id).await?;
    let rels = handle.store.list_relationships(&project_id).await?;
    Ok(Json(rels))
}
