//! Module generation endpoints.

use crate::entity::now_iso;
use crate::error::{ActionError, AppError};
use crate::extractors::{unknown_action, ActionRequest};
use crate::generator::{
    generate_from_schema, generate_from_template, module_templates, sync_schema_modules, Generated, ModuleConfig,
    TemplateRequest,
};
use crate::response::action_ok;
use crate::schema::TableSchema;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;

type ActionResult = Result<(StatusCode, Json<Value>), ActionError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FromSchema {
    #[serde(default)]
    table: Option<TableSchema>,
    /// Registry table to use when `table` is absent.
    #[serde(default)]
    table_id: Option<String>,
    #[serde(default)]
    template: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SchemaTables {
    #[serde(default)]
    tables: Vec<TableSchema>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncRequest {
    #[serde(default)]
    schema: Option<SchemaTables>,
    #[serde(default)]
    current_modules: Option<Vec<ModuleConfig>>,
    #[serde(default)]
    apply: bool,
}

fn generated(g: &Generated) -> ActionResult {
    Ok(action_ok(vec![
        ("module", serde_json::to_value(&g.module)?),
        ("view", serde_json::to_value(&g.view)?),
        ("files", g.files()?),
    ]))
}

pub async fn list_templates() -> ActionResult {
    Ok(action_ok(vec![("templates", serde_json::to_value(module_templates())?)]))
}

pub async fn post_modules(State(state): State<AppState>, req: ActionRequest) -> ActionResult {
    match req.action.as_str() {
        "generate_from_schema" => {
            let data: FromSchema = req.data()?;
            let table = match (data.table, data.table_id) {
                (Some(t), _) => t,
                (None, Some(id)) => state
                    .schema()
                    .await
                    .table(&id)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound("Table not found".into()))?,
                (None, None) => return Err(AppError::BadRequest("table is required".into()).into()),
            };
            let g = generate_from_schema(&table, data.template.as_deref().unwrap_or("crud"))?;
            generated(&g)
        }
        "generate_from_template" => {
            let data: TemplateRequest = req.data()?;
            generated(&generate_from_template(&data)?)
        }
        "sync_schema_modules" => sync(&state, req.data()?).await,
        _ => Err(unknown_action()),
    }
}

async fn sync(state: &AppState, data: SyncRequest) -> ActionResult {
    let tables = match data.schema {
        Some(s) => s.tables,
        None => state.schema().await.tables,
    };
    let modules = match data.current_modules {
        Some(m) => m,
        None => state.system.snapshot().await.modules,
    };
    let now = now_iso();
    let results = sync_schema_modules(&tables, &modules, &now)?;
    if data.apply {
        state
            .system
            .update(|c| {
                results.apply(&mut c.modules, &now);
                Ok(())
            })
            .await?;
        tracing::info!(
            created = results.created.len(),
            updated = results.updated.len(),
            removed = results.removed.len(),
            "schema modules synced"
        );
    }
    Ok(action_ok(vec![
        ("syncResults", serde_json::to_value(&results)?),
        ("applied", Value::Bool(data.apply)),
    ]))
}
