//! Production run flows and design print labels. Routes share the `/:path_segment/:id` shape of
//! the entity routes, so each handler checks the segment names the right entity.

use crate::entity::{EntityDef, EntityKind};
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{created, deleted, ok};
use crate::service::{CompleteRun, ProductionService, StartRun};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;
use std::sync::Arc;

/// Entity of `kind` when `segment` is its path.
fn entity_at(state: &AppState, segment: &str, kind: EntityKind) -> Result<Arc<EntityDef>, AppError> {
    let entity = state.entity(segment)?;
    if entity.kind != kind {
        return Err(AppError::NotFound("Not found".into()));
    }
    Ok(entity)
}

pub async fn start_run(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    body: Option<JsonBody<StartRun>>,
) -> Result<impl IntoResponse, AppError> {
    entity_at(&state, &path_segment, EntityKind::Production)?;
    let req = body.map(|JsonBody(b)| b).unwrap_or_default();
    let model = state.model()?;
    let outcome = ProductionService::start(state.store.as_ref(), &model, &id, req).await?;
    Ok(ok(outcome))
}

pub async fn complete_run(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    entity_at(&state, &path_segment, EntityKind::Production)?;
    let req: CompleteRun = serde_json::from_value(body)
        .map_err(|_| AppError::Validation("output_quantity must be a number".into()))?;
    let model = state.model()?;
    let outcome = ProductionService::complete(state.store.as_ref(), &model, &id, req).await?;
    Ok(ok(outcome))
}

pub async fn list_labels(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let designs = entity_at(&state, &path_segment, EntityKind::Design)?;
    let labels = state.labels.list(state.store.as_ref(), &designs, &id).await?;
    Ok(ok(labels))
}

pub async fn add_label(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let designs = entity_at(&state, &path_segment, EntityKind::Design)?;
    let label = state.labels.add(state.store.as_ref(), &designs, &id, body).await?;
    Ok(created(label))
}

pub async fn update_label(
    State(state): State<AppState>,
    Path((path_segment, id, label_id)): Path<(String, String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let designs = entity_at(&state, &path_segment, EntityKind::Design)?;
    let label = state.labels.update(state.store.as_ref(), &designs, &id, &label_id, body).await?;
    Ok(ok(label))
}

pub async fn delete_label(
    State(state): State<AppState>,
    Path((path_segment, id, label_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let designs = entity_at(&state, &path_segment, EntityKind::Design)?;
    let label = state.labels.delete(state.store.as_ref(), &designs, &id, &label_id).await?;
    Ok(deleted("label", label))
}
