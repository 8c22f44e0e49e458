//! System configuration: navigation modules, themes, layout and feature flags.

use crate::error::{ActionError, AppError};
use crate::extractors::{unknown_action, ActionRequest, JsonBody};
use crate::generator::ModuleConfig;
use crate::response::{action_ok, ok};
use crate::state::AppState;
use crate::system::{theme_css, ModuleRef, ModuleUpdate, NewCustomTheme, SetTheme, SystemConfig};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct SetValue {
    pub value: Value,
}

pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.system.snapshot().await)
}

pub async fn put_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    JsonBody(body): JsonBody<SetValue>,
) -> Result<impl IntoResponse, AppError> {
    let ((), config) = state.system.update(|c| c.set_key(&key, body.value)).await?;
    tracing::info!(key = %key, "system config updated");
    Ok(ok(config))
}

fn with_config(field: &str, value: Value, config: &SystemConfig) -> Result<(StatusCode, Json<Value>), ActionError> {
    Ok(action_ok(vec![(field, value), ("config", serde_json::to_value(config)?)]))
}

pub async fn post_config(
    State(state): State<AppState>,
    req: ActionRequest,
) -> Result<(StatusCode, Json<Value>), ActionError> {
    let system = &state.system;
    match req.action.as_str() {
        "set_theme" => {
            let data: SetTheme = req.data()?;
            let ((), config) = system.update(|c| c.set_theme(&data.theme_id)).await?;
            with_config("theme", Value::String(data.theme_id), &config)
        }
        "add_module" => {
            let data: ModuleConfig = req.data()?;
            let (module, config) = system.update(|c| c.add_module(data)).await?;
            with_config("module", serde_json::to_value(module)?, &config)
        }
        "update_module" => {
            let data: ModuleUpdate = req.data()?;
            let (module, config) = system.update(|c| c.update_module(&data.id, data.updates)).await?;
            with_config("module", serde_json::to_value(module)?, &config)
        }
        "remove_module" => {
            let data: ModuleRef = req.data()?;
            let (module, config) = system.update(|c| c.remove_module(&data.id)).await?;
            with_config("module", serde_json::to_value(module)?, &config)
        }
        "toggle_module" => {
            let data: ModuleRef = req.data()?;
            let (module, config) = system.update(|c| c.toggle_module(&data.id)).await?;
            with_config("module", serde_json::to_value(module)?, &config)
        }
        "add_custom_theme" => {
            let data: NewCustomTheme = req.data()?;
            let (theme, config) = system.update(|c| c.add_custom_theme(data)).await?;
            with_config("theme", serde_json::to_value(theme)?, &config)
        }
        "remove_custom_theme" => {
            let data: ModuleRef = req.data()?;
            let (theme, config) = system.update(|c| c.remove_custom_theme(&data.id)).await?;
            with_config("theme", serde_json::to_value(theme)?, &config)
        }
        _ => Err(unknown_action()),
    }
}

pub async fn theme_stylesheet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let config = state.system.snapshot().await;
    let theme = config
        .find_theme(&id)
        .ok_or_else(|| AppError::NotFound("Theme not found".into()))?;
    Ok(([(header::CONTENT_TYPE, "text/css; charset=utf-8")], theme_css(theme)))
}
