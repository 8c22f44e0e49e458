//! Resolved entity model: what the store and handlers need to serve one entity.

use crate::entity::records::efficiency_percent;
use crate::entity::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Material,
    Batch,
    Transaction,
    Production,
    Design,
    Customer,
    /// Table defined at runtime through the schema API.
    Dynamic,
}

/// PostgreSQL column type. Drives DDL and bind casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    BigSerial,
    BigInt,
    Double,
    Text,
    Boolean,
    Date,
    Timestamptz,
    Jsonb,
}

impl SqlType {
    pub fn ddl(self) -> &'static str {
        match self {
            SqlType::BigSerial => "BIGSERIAL",
            SqlType::BigInt => "BIGINT",
            SqlType::Double => "DOUBLE PRECISION",
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Date => "DATE",
            SqlType::Timestamptz => "TIMESTAMPTZ",
            SqlType::Jsonb => "JSONB",
        }
    }

    /// Cast applied to bind placeholders so text/number JSON values land in the right type.
    pub fn cast(self) -> Option<&'static str> {
        match self {
            SqlType::BigSerial | SqlType::BigInt => Some("bigint"),
            SqlType::Double => Some("double precision"),
            SqlType::Boolean => Some("boolean"),
            SqlType::Date => Some("date"),
            SqlType::Timestamptz => Some("timestamptz"),
            SqlType::Jsonb => Some("jsonb"),
            SqlType::Text => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    /// DB default expression, e.g. `NOW()` or `'active'`.
    pub default: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: &str, sql_type: SqlType) -> Self {
        ColumnInfo {
            name: name.to_string(),
            sql_type,
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default(mut self, expr: &str) -> Self {
        self.default = Some(expr.to_string());
        self
    }
}

/// Per-field request rule. Missing keys mean "no constraint".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: Some(true),
            ..Default::default()
        }
    }

    pub fn one_of(values: &[&str]) -> Self {
        ValidationRule {
            allowed: Some(values.iter().map(|v| Value::String(v.to_string())).collect()),
            ..Default::default()
        }
    }

    pub fn at_least(min: f64) -> Self {
        ValidationRule {
            minimum: Some(min),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct EntityDef {
    pub kind: EntityKind,
    /// URL segment and memory-store key, e.g. "materials".
    pub path: String,
    /// Used in messages, e.g. "material not found".
    pub singular: String,
    /// Primary id field, e.g. "material_id".
    pub id_field: String,
    /// SQL table name (public schema).
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
    /// Fields whose values must be unique across records.
    pub unique: Vec<String>,
    pub validation: HashMap<String, ValidationRule>,
}

impl EntityDef {
    pub fn not_found(&self) -> String {
        format!("{} not found", self.singular)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// True when `record` is addressed by `id`: its id field or a generic `id` field
    /// renders to the same string.
    pub fn matches_id(&self, record: &Record, id: &str) -> bool {
        [self.id_field.as_str(), "id"]
            .iter()
            .filter_map(|f| record.get(*f))
            .any(|v| id_string(v).as_deref() == Some(id))
    }

    /// Recompute fields derived from others. Called on every create and update.
    pub fn derive(&self, record: &mut Record) {
        if self.kind == EntityKind::Production {
            let completed = record.get("status").and_then(Value::as_str) == Some("completed");
            let output = record.get("output_quantity").and_then(Value::as_f64);
            let expected = record.get("expected_output").and_then(Value::as_f64);
            if let (true, Some(output), Some(expected)) = (completed, output, expected) {
                if let Some(pct) = efficiency_percent(output, expected) {
                    record.insert("efficiency".into(), Value::from(pct));
                }
            }
        }
    }
}

/// String form of an id value; numbers without a fraction print as integers.
pub fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(
            n.as_i64()
                .map(|i| i.to_string())
                .unwrap_or_else(|| n.to_string()),
        ),
        _ => None,
    }
}

#[derive(Clone, Debug, Default)]
pub struct EntityModel {
    pub entities: Vec<Arc<EntityDef>>,
    pub entity_by_path: HashMap<String, Arc<EntityDef>>,
}

impl EntityModel {
    pub fn new(entities: Vec<EntityDef>) -> Self {
        let entities: Vec<Arc<EntityDef>> = entities.into_iter().map(Arc::new).collect();
        let entity_by_path = entities
            .iter()
            .map(|e| (e.path.clone(), Arc::clone(e)))
            .collect();
        EntityModel {
            entities,
            entity_by_path,
        }
    }

    pub fn entity_by_path(&self, path: &str) -> Option<Arc<EntityDef>> {
        self.entity_by_path.get(path).cloned()
    }

    pub fn by_kind(&self, kind: EntityKind) -> Option<Arc<EntityDef>> {
        self.entities.iter().find(|e| e.kind == kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::builtin_entities;
    use serde_json::json;

    fn production() -> EntityDef {
        builtin_entities()
            .into_iter()
            .find(|e| e.kind == EntityKind::Production)
            .unwrap()
    }

    #[test]
    fn matches_specific_or_generic_id() {
        let e = production();
        let rec = json!({"production_id": 7}).as_object().unwrap().clone();
        assert!(e.matches_id(&rec, "7"));
        assert!(!e.matches_id(&rec, "8"));
        let rec = json!({"id": "abc"}).as_object().unwrap().clone();
        assert!(e.matches_id(&rec, "abc"));
    }

    #[test]
    fn efficiency_only_for_completed_runs() {
        let e = production();
        let mut rec = json!({"status": "in_progress", "output_quantity": 1900, "expected_output": 2000})
            .as_object()
            .unwrap()
            .clone();
        e.derive(&mut rec);
        assert!(rec.get("efficiency").is_none());

        rec.insert("status".into(), json!("completed"));
        e.derive(&mut rec);
        assert_eq!(rec["efficiency"], json!(95));
    }

    #[test]
    fn zero_expected_output_leaves_efficiency_alone() {
        let e = production();
        let mut rec = json!({"status": "completed", "output_quantity": 10, "expected_output": 0, "efficiency": 0})
            .as_object()
            .unwrap()
            .clone();
        e.derive(&mut rec);
        assert_eq!(rec["efficiency"], json!(0));
    }
}
