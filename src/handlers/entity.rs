//! Entity CRUD handlers. The entity is resolved from the first path segment on every request.

use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::{created, deleted, ok};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.entity(&path_segment)?;
    let rows = CrudService::list(state.store.as_ref(), &entity).await?;
    Ok(ok(rows))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.entity(&path_segment)?;
    let row = CrudService::read(state.store.as_ref(), &entity, &id).await?;
    Ok(ok(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.entity(&path_segment)?;
    let row = CrudService::create(state.store.as_ref(), &entity, body).await?;
    Ok(created(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.entity(&path_segment)?;
    let row = CrudService::update(state.store.as_ref(), &entity, &id, body).await?;
    Ok(ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = state.entity(&path_segment)?;
    let row = CrudService::delete(state.store.as_ref(), &entity, &id).await?;
    Ok(deleted(&entity.singular, row))
}

/// `PUT /api/<entity>` without an id.
pub async fn update_without_id(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.entity(&path_segment)?;
    Err(AppError::BadRequest("ID is required for update".into()))
}

/// `DELETE /api/<entity>` without an id.
pub async fn delete_without_id(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.entity(&path_segment)?;
    Err(AppError::BadRequest("ID is required for deletion".into()))
}
