//! Validated entity CRUD over an `EntityStore`.

use crate::entity::{EntityDef, Record};
use crate::error::AppError;
use crate::service::RequestValidator;
use crate::store::EntityStore;
use serde_json::Value;

pub struct CrudService;

/// Request bodies must be JSON objects.
pub fn into_record(body: Value) -> Result<Record, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest("Request body must be a JSON object".into())),
    }
}

impl CrudService {
    pub async fn list(store: &dyn EntityStore, entity: &EntityDef) -> Result<Vec<Record>, AppError> {
        store.list(entity).await
    }

    pub async fn read(store: &dyn EntityStore, entity: &EntityDef, id: &str) -> Result<Record, AppError> {
        store
            .get(entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.not_found()))
    }

    pub async fn create(store: &dyn EntityStore, entity: &EntityDef, body: Value) -> Result<Record, AppError> {
        let record = into_record(body)?;
        RequestValidator::validate(&record, &entity.validation)?;
        let created = store.insert(entity, record).await?;
        tracing::info!(entity = %entity.path, id = ?created.get(&entity.id_field), "created");
        Ok(created)
    }

    pub async fn update(
        store: &dyn EntityStore,
        entity: &EntityDef,
        id: &str,
        body: Value,
    ) -> Result<Record, AppError> {
        let patch = into_record(body)?;
        RequestValidator::validate_partial(&patch, &entity.validation)?;
        store
            .update(entity, id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.not_found()))
    }

    pub async fn delete(store: &dyn EntityStore, entity: &EntityDef, id: &str) -> Result<Record, AppError> {
        let deleted = store
            .delete(entity, id)
            .await?
            .ok_or_else(|| AppError::NotFound(entity.not_found()))?;
        tracing::info!(entity = %entity.path, id, "deleted");
        Ok(deleted)
    }
}
