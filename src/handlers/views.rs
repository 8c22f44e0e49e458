//! Runtime rendering of module views: the view itself, its list rows and form submissions.

use crate::entity::EntityDef;
use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::generator::{find_template, ModuleConfig, PageView, ViewAction};
use crate::pages::PAGE_FILE;
use crate::response::{created, deleted, ok};
use crate::service::crud::into_record;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct RowQuery {
    #[serde(default)]
    pub search: Option<String>,
}

fn page_path(module: &ModuleConfig) -> Option<String> {
    let dir = module.path.trim_matches('/');
    (!dir.is_empty()).then(|| format!("{}/{}", dir, PAGE_FILE))
}

/// A saved page file wins; otherwise the view is generated from the module's schema table.
async fn module_view(state: &AppState, module_id: &str) -> Result<PageView, AppError> {
    let module = state
        .system
        .snapshot()
        .await
        .module(module_id)
        .filter(|m| m.enabled)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Module not found".into()))?;
    if let Some(rel) = page_path(&module) {
        if let Some(view) = state.pages.read(&rel).await? {
            return Ok(view);
        }
    }
    let schema = state.schema().await;
    let table = schema
        .table(module.table_id().unwrap_or(module.id.as_str()))
        .ok_or_else(|| AppError::NotFound("View not found".into()))?;
    let template_id = module.template_id().unwrap_or("crud");
    let template =
        find_template(template_id).ok_or_else(|| AppError::NotFound("Template not found".into()))?;
    Ok(PageView::from_table(table, &template))
}

fn source(state: &AppState, view: &PageView) -> Result<Arc<EntityDef>, AppError> {
    let path = view
        .data_source
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("View has no data source".into()))?;
    state.entity(path)
}

fn allow(view: &PageView, action: ViewAction) -> Result<(), AppError> {
    if view.can(action) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Action not allowed for this view".into()))
    }
}

pub async fn get_view(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(module_view(&state, &module_id).await?))
}

pub async fn list_rows(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    Query(q): Query<RowQuery>,
) -> Result<impl IntoResponse, AppError> {
    let view = module_view(&state, &module_id).await?;
    let entity = source(&state, &view)?;
    let records = CrudService::list(state.store.as_ref(), &entity).await?;
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let rows: Vec<_> = view
        .filter_rows(&records, search)
        .into_iter()
        .map(|r| view.project_row(r, &entity.id_field))
        .collect();
    Ok(ok(rows))
}

pub async fn create_row(
    State(state): State<AppState>,
    Path(module_id): Path<String>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let view = module_view(&state, &module_id).await?;
    allow(&view, ViewAction::Create)?;
    let entity = source(&state, &view)?;
    let record = view.validate_submission(&into_record(body)?, false)?;
    let row = CrudService::create(state.store.as_ref(), &entity, Value::Object(record)).await?;
    Ok(created(row))
}

pub async fn update_row(
    State(state): State<AppState>,
    Path((module_id, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let view = module_view(&state, &module_id).await?;
    allow(&view, ViewAction::Edit)?;
    let entity = source(&state, &view)?;
    let patch = view.validate_submission(&into_record(body)?, true)?;
    let row = CrudService::update(state.store.as_ref(), &entity, &id, Value::Object(patch)).await?;
    Ok(ok(row))
}

pub async fn delete_row(
    State(state): State<AppState>,
    Path((module_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let view = module_view(&state, &module_id).await?;
    allow(&view, ViewAction::Delete)?;
    let entity = source(&state, &view)?;
    let row = CrudService::delete(state.store.as_ref(), &entity, &id).await?;
    Ok(deleted(&entity.singular, row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str) -> ModuleConfig {
        ModuleConfig {
            id: "m".into(),
            name: "M".into(),
            path: path.into(),
            icon: "Package".into(),
            description: String::new(),
            enabled: true,
            order: 0,
            permissions: None,
            component: None,
            settings: None,
        }
    }

    #[test]
    fn page_file_lives_under_module_path() {
        assert_eq!(page_path(&module("/materials")).as_deref(), Some("materials/page.json"));
        assert_eq!(page_path(&module("/admin/users/")).as_deref(), Some("admin/users/page.json"));
        assert_eq!(page_path(&module("/")), None);
    }
}
