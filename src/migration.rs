//! DDL: entity tables at start-up and after schema changes, plus SQL for recorded migrations.

use crate::entity::{builtin_entities, EntityDef, EntityKind, EntityModel};
use crate::error::AppError;
use crate::schema::resolve::{dynamic_entity, sql_type};
use crate::schema::types::*;
use crate::schema::validator::check_identifier;
use crate::sql::{create_table, quoted};
use sqlx::PgPool;

fn add_column(table: &str, col: &crate::entity::ColumnInfo) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
        quoted(table),
        quoted(&col.name),
        col.sql_type.ddl()
    );
    if let Some(d) = &col.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(d);
    }
    sql
}

/// Create every entity table that is missing. Dynamic tables also gain columns for fields
/// added since they were created; dropped fields keep their columns.
pub async fn ensure_entity_tables(pool: &PgPool, model: &EntityModel) -> Result<(), AppError> {
    for entity in &model.entities {
        sqlx::query(&create_table(entity)).execute(pool).await?;
        if entity.kind == EntityKind::Dynamic {
            for col in entity.columns.iter().filter(|c| c.name != entity.id_field) {
                sqlx::query(&add_column(&entity.table_name, col)).execute(pool).await?;
            }
        }
    }
    tracing::info!(tables = model.entities.len(), "entity tables ensured");
    Ok(())
}

fn field_column(table: &str, field: &SchemaField) -> Result<String, AppError> {
    check_identifier(&field.name)?;
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
        quoted(table),
        quoted(&field.name),
        sql_type(field.field_type.kind).ddl()
    ))
}

fn drop_column(table: &str, field: &SchemaField) -> String {
    format!("ALTER TABLE {} DROP COLUMN IF EXISTS {}", quoted(table), quoted(&field.name))
}

fn retype_column(table: &str, field: &SchemaField) -> String {
    let ty = sql_type(field.field_type.kind).ddl();
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
        quoted(table),
        quoted(&field.name),
        ty,
        quoted(&field.name),
        ty.to_lowercase()
    )
}

fn create_index(table: &str, index: &IndexSpec) -> Result<String, AppError> {
    check_identifier(&index.name)?;
    for f in &index.fields {
        check_identifier(f)?;
    }
    Ok(format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if index.unique == Some(true) { "UNIQUE " } else { "" },
        quoted(&index.name),
        quoted(table),
        index.fields.iter().map(|f| quoted(f)).collect::<Vec<_>>().join(", ")
    ))
}

fn drop_index(index: &IndexSpec) -> String {
    format!("DROP INDEX IF EXISTS {}", quoted(&index.name))
}

/// Table definition for a migration: the schema's table when known, else one built from
/// the migration's added fields.
fn migration_entity(table: &str, m: &SchemaMigration, schema: &DatabaseSchema) -> EntityDef {
    if let Some(t) = schema.tables.iter().find(|t| t.name == table) {
        return dynamic_entity(t);
    }
    let fields = m.changes.iter().filter_map(|c| c.field.clone()).collect();
    dynamic_entity(&TableSchema {
        id: table.to_string(),
        name: table.to_string(),
        label: table.to_string(),
        description: String::new(),
        fields,
        relationships: Vec::new(),
        permissions: TablePermissions::default(),
        display_settings: DisplaySettings::default(),
        hooks: None,
        created_at: String::new(),
        updated_at: String::new(),
    })
}

/// Reject migrations aimed at the `_sys*` document tables, and destructive ones aimed at a
/// built-in entity table.
pub fn check_target(table: &str, kind: MigrationKind) -> Result<(), AppError> {
    check_identifier(table)?;
    if table.starts_with("_sys") {
        return Err(AppError::BadRequest(format!("table '{}' is internal", table)));
    }
    let destructive = matches!(
        kind,
        MigrationKind::DropTable | MigrationKind::DropField | MigrationKind::ModifyField
    );
    let builtin = builtin_entities()
        .iter()
        .any(|e| e.table_name == table || e.path == table);
    if destructive && builtin {
        return Err(AppError::BadRequest(format!(
            "built-in table '{}' cannot be dropped or altered",
            table
        )));
    }
    Ok(())
}

/// (forward, rollback) SQL for a migration. Statements are separated by `;\n`.
pub fn migration_sql(m: &SchemaMigration, schema: &DatabaseSchema) -> Result<(String, String), AppError> {
    let table = m
        .table_name
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("tableName is required".into()))?;
    check_target(table, m.kind)?;
    let mut up = Vec::new();
    let mut down = Vec::new();
    match m.kind {
        MigrationKind::CreateTable => {
            up.push(create_table(&migration_entity(table, m, schema)));
            down.push(format!("DROP TABLE IF EXISTS {}", quoted(table)));
        }
        MigrationKind::DropTable => {
            up.push(format!("DROP TABLE IF EXISTS {}", quoted(table)));
            down.push(create_table(&migration_entity(table, m, schema)));
        }
        MigrationKind::ModifyTable => {}
        MigrationKind::AddField | MigrationKind::DropField | MigrationKind::ModifyField => {
            for change in &m.changes {
                let Some(field) = &change.field else { continue };
                match (m.kind, change.action) {
                    (MigrationKind::AddField, _) | (_, ChangeAction::Add) => {
                        up.push(field_column(table, field)?);
                        down.push(drop_column(table, field));
                    }
                    (MigrationKind::DropField, _) | (_, ChangeAction::Remove) => {
                        up.push(drop_column(table, field));
                        down.push(field_column(table, field)?);
                    }
                    _ => {
                        check_identifier(&field.name)?;
                        up.push(retype_column(table, field));
                        if let Some(old) = &change.old_field {
                            down.push(retype_column(table, old));
                        }
                    }
                }
            }
        }
        MigrationKind::AddIndex | MigrationKind::DropIndex => {
            for index in m.changes.iter().filter_map(|c| c.index.as_ref()) {
                if m.kind == MigrationKind::AddIndex {
                    up.push(create_index(table, index)?);
                    down.push(drop_index(index));
                } else {
                    up.push(drop_index(index));
                    down.push(create_index(table, index)?);
                }
            }
        }
    }
    down.reverse();
    Ok((up.join(";\n"), down.join(";\n")))
}

/// Statements of a migration script, split on `;` line ends.
fn statements(sql: &str) -> Vec<String> {
    sql.split(";\n")
        .map(|s| s.trim().trim_end_matches(';').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run a migration's SQL in one transaction, one statement at a time.
pub async fn execute_migration(pool: &PgPool, sql: &str) -> Result<(), AppError> {
    let statements = statements(sql);
    if statements.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for stmt in &statements {
        tracing::debug!(sql = %stmt, "executing migration statement");
        sqlx::query(stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::default_schema;
    use serde_json::json;

    fn migration(v: serde_json::Value) -> SchemaMigration {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn add_field_generates_column_and_rollback() {
        let m = migration(json!({
            "type": "add_field", "tableName": "materials",
            "changes": [{"action": "add", "field": {"name": "sku", "label": "SKU", "type": {"type": "string"}}}]
        }));
        let (up, down) = migration_sql(&m, &default_schema()).unwrap();
        assert_eq!(up, "ALTER TABLE \"materials\" ADD COLUMN IF NOT EXISTS \"sku\" TEXT");
        assert_eq!(down, "ALTER TABLE \"materials\" DROP COLUMN IF EXISTS \"sku\"");
    }

    #[test]
    fn create_table_uses_migration_fields() {
        let m = migration(json!({
            "type": "create_table", "tableName": "suppliers",
            "changes": [{"action": "add", "field": {"name": "name", "label": "Name", "type": {"type": "string"}}}]
        }));
        let (up, down) = migration_sql(&m, &default_schema()).unwrap();
        assert!(up.starts_with("CREATE TABLE IF NOT EXISTS \"suppliers\""));
        assert!(up.contains("\"name\" TEXT"));
        assert_eq!(down, "DROP TABLE IF EXISTS \"suppliers\"");
    }

    #[test]
    fn missing_table_name_is_rejected() {
        let m = migration(json!({"type": "drop_table"}));
        assert!(matches!(migration_sql(&m, &default_schema()), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn internal_and_builtin_tables_are_protected() {
        let schema = default_schema();
        for (kind, table) in [
            ("drop_table", "_sys_documents"),
            ("add_field", "_sys_documents_history"),
            ("drop_table", "production_runs"),
            ("drop_table", "materials"),
            ("drop_field", "cup_designs"),
        ] {
            let m = migration(json!({"type": kind, "tableName": table}));
            assert!(
                matches!(migration_sql(&m, &schema), Err(AppError::BadRequest(_))),
                "{} on {} should be rejected",
                kind,
                table
            );
        }
        let m = migration(json!({"type": "drop_table", "tableName": "widgets"}));
        assert!(migration_sql(&m, &schema).is_ok());
    }

    #[test]
    fn scripts_split_into_statements() {
        assert_eq!(
            statements("ALTER TABLE \"a\" ADD COLUMN x TEXT;\nCREATE INDEX i ON \"a\" (x);\n"),
            vec!["ALTER TABLE \"a\" ADD COLUMN x TEXT", "CREATE INDEX i ON \"a\" (x)"]
        );
        assert!(statements("  ").is_empty());
    }

    #[test]
    fn unsafe_index_name_is_rejected() {
        let m = migration(json!({
            "type": "add_index", "tableName": "materials",
            "changes": [{"action": "add", "index": {"name": "x; drop", "fields": ["name"]}}]
        }));
        assert!(migration_sql(&m, &default_schema()).is_err());
    }
}
