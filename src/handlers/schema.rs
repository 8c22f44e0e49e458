//! Schema registry endpoints: `GET /api/schema` and the `{action, data}` mutations.

use crate::entity::now_iso;
use crate::error::ActionError;
use crate::extractors::{unknown_action, ActionRequest};
use crate::migration::{check_target, execute_migration, migration_sql};
use crate::response::action_ok;
use crate::schema::registry::{AddField, FieldRef, ModifyField, ModifyTable, NewTable, TableRef};
use crate::schema::{DatabaseSchema, MigrationStatus, SchemaMigration, TableSchema};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

type ActionResult = Result<(StatusCode, Json<Value>), ActionError>;

fn table_and_schema(table: &TableSchema, schema: &DatabaseSchema) -> ActionResult {
    Ok(action_ok(vec![
        ("table", serde_json::to_value(table)?),
        ("schema", serde_json::to_value(schema)?),
    ]))
}

pub async fn get_schema(State(state): State<AppState>) -> ActionResult {
    let schema = state.schema().await;
    Ok(action_ok(vec![("schema", serde_json::to_value(&schema)?)]))
}

pub async fn post_schema(State(state): State<AppState>, req: ActionRequest) -> ActionResult {
    match req.action.as_str() {
        "create_table" => {
            let data: NewTable = req.data()?;
            let (table, schema) = state.update_schema(|s| s.create_table(data)).await?;
            tracing::info!(table = %table.id, "table created");
            table_and_schema(&table, &schema)
        }
        "modify_table" => {
            let data: ModifyTable = req.data()?;
            let (table, schema) = state.update_schema(|s| s.modify_table(data)).await?;
            table_and_schema(&table, &schema)
        }
        "delete_table" => {
            let data: TableRef = req.data()?;
            let (table, schema) = state.update_schema(|s| s.delete_table(data)).await?;
            tracing::info!(table = %table.id, "table removed from schema");
            Ok(action_ok(vec![("schema", serde_json::to_value(&schema)?)]))
        }
        "add_field" => {
            let data: AddField = req.data()?;
            let (table, schema) = state.update_schema(|s| s.add_field(data)).await?;
            table_and_schema(&table, &schema)
        }
        "modify_field" => {
            let data: ModifyField = req.data()?;
            let (table, schema) = state.update_schema(|s| s.modify_field(data)).await?;
            table_and_schema(&table, &schema)
        }
        "delete_field" => {
            let data: FieldRef = req.data()?;
            let (table, schema) = state.update_schema(|s| s.delete_field(data)).await?;
            table_and_schema(&table, &schema)
        }
        "apply_migration" => apply_migration(&state, req.data()?).await,
        _ => Err(unknown_action()),
    }
}

/// Fill in ids and SQL, run it on Postgres, and record the outcome. A failed execution is
/// recorded with status `failed` and reported with `success: false`.
async fn apply_migration(state: &AppState, mut m: SchemaMigration) -> ActionResult {
    if let Some(table) = m.table_name.as_deref() {
        check_target(table, m.kind)?;
    }
    let current = state.schema().await;
    if m.id.is_empty() {
        m.id = uuid::Uuid::new_v4().to_string();
    }
    if m.version.is_empty() {
        m.version = current.version.clone();
    }
    if m.sql.is_none() || m.rollback_sql.is_none() {
        let (up, down) = migration_sql(&m, &current)?;
        m.sql = m.sql.or(Some(up));
        m.rollback_sql = m.rollback_sql.or(Some(down));
    }
    m.status = MigrationStatus::Applied;
    m.applied_at = Some(now_iso());
    let mut failure = None;
    if let (Some(pool), Some(sql)) = (state.pool(), m.sql.as_deref()) {
        if let Err(e) = execute_migration(pool, sql).await {
            tracing::warn!(migration = %m.id, error = %e, "migration failed");
            m.status = MigrationStatus::Failed;
            failure = Some("Migration failed");
        }
    }
    let (migration, schema) = state
        .update_schema(move |s| {
            s.record_migration(m.clone());
            Ok(m)
        })
        .await?;
    let mut body = json!({
        "success": failure.is_none(),
        "migration": migration,
        "schema": schema,
    });
    if let Some(msg) = failure {
        body["error"] = json!(msg);
    }
    Ok((StatusCode::OK, Json(body)))
}
