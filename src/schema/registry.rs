//! Schema mutations. Each returns the affected table; the caller validates, persists and
//! swaps in the new document.

use crate::entity::{now_iso, Record};
use crate::error::{AppError, SchemaError};
use crate::naming::table_slug;
use crate::schema::defaults::default_fields;
use crate::schema::types::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTable {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<SchemaField>>,
    #[serde(default)]
    pub relationships: Option<Vec<Relationship>>,
    #[serde(default)]
    pub permissions: Option<TablePermissions>,
    #[serde(default)]
    pub display_settings: Option<DisplaySettings>,
    #[serde(default)]
    pub hooks: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TableRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ModifyTable {
    pub id: String,
    #[serde(default)]
    pub updates: Record,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddField {
    pub table_id: String,
    pub field: SchemaField,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyField {
    pub table_id: String,
    pub field_name: String,
    #[serde(default)]
    pub updates: Record,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub table_id: String,
    pub field_name: String,
}

/// Shallow-merge `updates` over the JSON form of `current`, skipping `protected` keys.
pub fn merge_json<T: Serialize + DeserializeOwned>(
    current: &T,
    updates: Record,
    protected: &[&str],
) -> Result<T, AppError> {
    let mut value = serde_json::to_value(current)?;
    if let Value::Object(map) = &mut value {
        for (k, v) in updates {
            if !protected.contains(&k.as_str()) {
                map.insert(k, v);
            }
        }
    }
    serde_json::from_value(value).map_err(|e| AppError::BadRequest(format!("Invalid update: {}", e)))
}

fn table_not_found() -> AppError {
    AppError::NotFound("Table not found".into())
}

fn field_not_found() -> AppError {
    AppError::NotFound("Field not found".into())
}

impl DatabaseSchema {
    fn table_mut(&mut self, id: &str) -> Result<&mut TableSchema, AppError> {
        self.tables.iter_mut().find(|t| t.id == id).ok_or_else(table_not_found)
    }

    /// Stamp the table (when given) and the schema as updated now.
    fn touch(&mut self, table_id: Option<&str>) {
        let now = now_iso();
        if let Some(id) = table_id {
            if let Some(t) = self.tables.iter_mut().find(|t| t.id == id) {
                t.updated_at = now.clone();
            }
        }
        self.updated_at = now;
    }

    pub fn create_table(&mut self, data: NewTable) -> Result<TableSchema, AppError> {
        let (Some(name), Some(label)) = (
            data.name.filter(|s| !s.trim().is_empty()),
            data.label.filter(|s| !s.trim().is_empty()),
        ) else {
            return Err(SchemaError::MissingNameOrLabel.into());
        };
        let slug = table_slug(&name);
        if self.tables.iter().any(|t| t.id == slug || t.name == slug) {
            return Err(AppError::Conflict(format!("Table '{}' already exists", slug)));
        }
        let now = now_iso();
        let table = TableSchema {
            id: slug.clone(),
            name: slug,
            label,
            description: data.description.unwrap_or_default(),
            fields: data.fields.unwrap_or_else(default_fields),
            relationships: data.relationships.unwrap_or_default(),
            permissions: data.permissions.unwrap_or_default(),
            display_settings: data.display_settings.unwrap_or_default(),
            hooks: data.hooks,
            created_at: now.clone(),
            updated_at: now,
        };
        self.tables.push(table.clone());
        self.touch(None);
        Ok(table)
    }

    pub fn modify_table(&mut self, data: ModifyTable) -> Result<TableSchema, AppError> {
        let table = self.table_mut(&data.id)?;
        let updated: TableSchema = merge_json(&*table, data.updates, &["id", "createdAt"])?;
        *table = updated;
        self.touch(Some(&data.id));
        self.table(&data.id).cloned().ok_or_else(table_not_found)
    }

    pub fn delete_table(&mut self, data: TableRef) -> Result<TableSchema, AppError> {
        let idx = self
            .tables
            .iter()
            .position(|t| t.id == data.id)
            .ok_or_else(table_not_found)?;
        let removed = self.tables.remove(idx);
        self.touch(None);
        Ok(removed)
    }

    pub fn add_field(&mut self, data: AddField) -> Result<TableSchema, AppError> {
        let table = self.table_mut(&data.table_id)?;
        if table.field(&data.field.name).is_some() {
            return Err(AppError::Conflict(format!(
                "Field '{}' already exists in table {}",
                data.field.name, table.id
            )));
        }
        table.fields.push(data.field);
        self.touch(Some(&data.table_id));
        self.table(&data.table_id).cloned().ok_or_else(table_not_found)
    }

    pub fn modify_field(&mut self, data: ModifyField) -> Result<TableSchema, AppError> {
        let table = self.table_mut(&data.table_id)?;
        let field = table
            .fields
            .iter_mut()
            .find(|f| f.name == data.field_name)
            .ok_or_else(field_not_found)?;
        *field = merge_json(&*field, data.updates, &[])?;
        self.touch(Some(&data.table_id));
        self.table(&data.table_id).cloned().ok_or_else(table_not_found)
    }

    pub fn delete_field(&mut self, data: FieldRef) -> Result<TableSchema, AppError> {
        let table = self.table_mut(&data.table_id)?;
        let idx = table
            .fields
            .iter()
            .position(|f| f.name == data.field_name)
            .ok_or_else(field_not_found)?;
        table.fields.remove(idx);
        self.touch(Some(&data.table_id));
        self.table(&data.table_id).cloned().ok_or_else(table_not_found)
    }

    pub fn record_migration(&mut self, migration: SchemaMigration) {
        self.migrations.push(migration);
        self.touch(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::defaults::default_schema;
    use serde_json::json;

    fn new_table(name: &str, label: &str) -> NewTable {
        NewTable {
            name: Some(name.into()),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    #[test]
    fn create_table_slugs_name_and_applies_defaults() {
        let mut s = default_schema();
        let t = s.create_table(new_table("Purchase Orders", "Purchase Orders")).unwrap();
        assert_eq!(t.id, "purchase_orders");
        assert_eq!(t.fields.len(), 2);
        assert!(t.permissions.delete);
        assert!(matches!(
            s.create_table(new_table("purchase orders", "Again")),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn create_table_requires_name_and_label() {
        let mut s = default_schema();
        let err = s.create_table(new_table("x", " ")).unwrap_err();
        assert_eq!(err.to_string(), "Table name and label are required");
    }

    #[test]
    fn modify_table_merges_and_keeps_id() {
        let mut s = default_schema();
        let updates = json!({"label": "Stock", "id": "hijack"}).as_object().unwrap().clone();
        let t = s.modify_table(ModifyTable { id: "materials".into(), updates }).unwrap();
        assert_eq!(t.id, "materials");
        assert_eq!(t.label, "Stock");
        assert!(matches!(
            s.modify_table(ModifyTable { id: "nope".into(), updates: Record::new() }),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn field_lifecycle() {
        let mut s = default_schema();
        let field: SchemaField = serde_json::from_value(json!({
            "name": "sku", "label": "SKU", "type": {"type": "string"}, "order": 8
        }))
        .unwrap();
        s.add_field(AddField { table_id: "materials".into(), field: field.clone() }).unwrap();
        assert!(matches!(
            s.add_field(AddField { table_id: "materials".into(), field }),
            Err(AppError::Conflict(_))
        ));
        let updates = json!({"label": "Stock Keeping Unit"}).as_object().unwrap().clone();
        let t = s
            .modify_field(ModifyField { table_id: "materials".into(), field_name: "sku".into(), updates })
            .unwrap();
        assert_eq!(t.field("sku").unwrap().label, "Stock Keeping Unit");
        s.delete_field(FieldRef { table_id: "materials".into(), field_name: "sku".into() }).unwrap();
        assert!(matches!(
            s.delete_field(FieldRef { table_id: "materials".into(), field_name: "sku".into() }),
            Err(AppError::NotFound(_))
        ));
    }
}
