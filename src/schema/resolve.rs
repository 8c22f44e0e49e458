//! Turn schema tables into routable entities.

use crate::entity::{builtin_entities, ColumnInfo, EntityDef, EntityKind, EntityModel, SqlType, ValidationRule};
use crate::naming::strip_plural;
use crate::schema::types::{DatabaseSchema, FieldKind, SchemaField, TableSchema};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Field names the store manages itself.
const MANAGED: &[&str] = &["id", "createdAt", "created_at", "updatedAt", "updated_at"];

pub fn sql_type(kind: FieldKind) -> SqlType {
    match kind {
        FieldKind::String | FieldKind::Text | FieldKind::Reference => SqlType::Text,
        FieldKind::Number => SqlType::Double,
        FieldKind::Boolean => SqlType::Boolean,
        FieldKind::Date => SqlType::Date,
        FieldKind::Datetime => SqlType::Timestamptz,
        FieldKind::Json => SqlType::Jsonb,
    }
}

fn rule_for(field: &SchemaField) -> Option<ValidationRule> {
    let ft = &field.field_type;
    let mut rule = ValidationRule::default();
    if ft.is_required() && field.editable {
        rule.required = Some(true);
    }
    if let Some(v) = &ft.validation {
        rule.minimum = v.min;
        rule.maximum = v.max;
        rule.pattern = v.pattern.clone();
        rule.allowed = v
            .allowed
            .as_ref()
            .map(|a| a.iter().cloned().map(Value::String).collect());
    }
    match ft.kind {
        FieldKind::Date => rule.format = Some("date".into()),
        FieldKind::Datetime => rule.format = Some("datetime".into()),
        _ => {}
    }
    let empty = rule.required.is_none()
        && rule.minimum.is_none()
        && rule.maximum.is_none()
        && rule.pattern.is_none()
        && rule.allowed.is_none()
        && rule.format.is_none();
    (!empty).then_some(rule)
}

/// Entity definition for a schema table, keyed by a generic `id`.
pub fn dynamic_entity(table: &TableSchema) -> EntityDef {
    let mut columns = vec![ColumnInfo::new("id", SqlType::BigSerial).not_null()];
    let mut unique = Vec::new();
    let mut validation = HashMap::new();
    let mut fields: Vec<&SchemaField> = table
        .fields
        .iter()
        .filter(|f| !MANAGED.contains(&f.name.as_str()))
        .collect();
    fields.sort_by_key(|f| f.order);
    for f in fields {
        columns.push(ColumnInfo::new(&f.name, sql_type(f.field_type.kind)));
        if f.field_type.unique == Some(true) {
            unique.push(f.name.clone());
        }
        if let Some(rule) = rule_for(f) {
            validation.insert(f.name.clone(), rule);
        }
    }
    for name in ["created_at", "updated_at"] {
        columns.push(ColumnInfo::new(name, SqlType::Timestamptz).not_null().default("NOW()"));
    }
    EntityDef {
        kind: EntityKind::Dynamic,
        path: table.name.clone(),
        singular: strip_plural(&table.name).to_string(),
        id_field: "id".into(),
        table_name: table.name.clone(),
        columns,
        unique,
        validation,
    }
}

/// Built-in entities plus one dynamic entity per schema table. Built-in paths and table names
/// take precedence, so schema tables that shadow them are not registered.
pub fn build_model(schema: &DatabaseSchema) -> EntityModel {
    let mut entities = builtin_entities();
    let mut taken: HashSet<String> = entities
        .iter()
        .flat_map(|e| [e.path.clone(), e.table_name.clone()])
        .collect();
    for table in &schema.tables {
        if taken.contains(&table.name) || table.name.starts_with("_sys") {
            tracing::debug!(table = %table.name, "schema table shadowed by a built-in entity");
            continue;
        }
        taken.insert(table.name.clone());
        entities.push(dynamic_entity(table));
    }
    EntityModel::new(entities)
}

/// Entity paths that exist regardless of the schema.
pub fn builtin_paths() -> HashSet<String> {
    builtin_entities().into_iter().map(|e| e.path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::defaults::default_schema;
    use crate::schema::registry::NewTable;
    use serde_json::json;

    #[test]
    fn default_schema_tables_are_shadowed_by_builtins() {
        let model = build_model(&default_schema());
        assert_eq!(model.entities.len(), 6);
        assert_eq!(model.entity_by_path("materials").unwrap().kind, EntityKind::Material);
    }

    #[test]
    fn new_table_becomes_dynamic_entity() {
        let mut schema = default_schema();
        let fields = serde_json::from_value(json!([
            {"name": "id", "label": "ID", "type": {"type": "string", "required": true}, "order": 0, "editable": false},
            {"name": "title", "label": "Title", "type": {"type": "string", "required": true}, "order": 1},
            {"name": "grade", "label": "Grade", "type": {"type": "string", "validation": {"enum": ["A", "B"]}}, "order": 2},
            {"name": "due", "label": "Due", "type": {"type": "date"}, "order": 3}
        ]))
        .unwrap();
        schema
            .create_table(NewTable {
                name: Some("Suppliers".into()),
                label: Some("Suppliers".into()),
                fields: Some(fields),
                ..Default::default()
            })
            .unwrap();
        let model = build_model(&schema);
        let e = model.entity_by_path("suppliers").unwrap();
        assert_eq!(e.kind, EntityKind::Dynamic);
        assert_eq!(e.id_field, "id");
        assert_eq!(e.singular, "supplier");
        assert_eq!(e.column("due").unwrap().sql_type, SqlType::Date);
        assert!(e.validation["title"].required == Some(true));
        assert!(e.validation.get("id").is_none());
        assert_eq!(e.validation["grade"].allowed.as_ref().unwrap().len(), 2);
    }
}
