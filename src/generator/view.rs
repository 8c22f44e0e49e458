//! Declarative page description for a module, interpreted at request time: list columns,
//! search, and form validation for submissions.

use crate::entity::Record;
use crate::error::AppError;
use crate::generator::templates::ModuleTemplate;
use crate::naming::to_kebab_case;
use crate::schema::types::{FieldKind, SchemaField, TableSchema};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Text,
    Boolean,
    Date,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Date,
    Datetime,
    Checkbox,
    Select,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewAction {
    Create,
    Edit,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewColumn {
    pub field: String,
    pub label: String,
    pub cell: CellKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub input: InputKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub template: String,
    /// Entity path the rows come from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default)]
    pub columns: Vec<ViewColumn>,
    #[serde(default)]
    pub form: Vec<FormField>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub actions: Vec<ViewAction>,
}

fn cell_kind(kind: FieldKind) -> CellKind {
    match kind {
        FieldKind::Boolean => CellKind::Boolean,
        FieldKind::Date | FieldKind::Datetime => CellKind::Date,
        _ => CellKind::Text,
    }
}

fn form_field(f: &SchemaField) -> FormField {
    let options = f
        .field_type
        .validation
        .as_ref()
        .and_then(|v| v.allowed.clone())
        .unwrap_or_default();
    let input = match f.field_type.kind {
        FieldKind::Boolean => InputKind::Checkbox,
        _ if !options.is_empty() => InputKind::Select,
        FieldKind::Number => InputKind::Number,
        FieldKind::Date => InputKind::Date,
        FieldKind::Datetime => InputKind::Datetime,
        _ => InputKind::Text,
    };
    FormField {
        name: f.name.clone(),
        label: f.label.clone(),
        input,
        required: f.field_type.is_required(),
        options,
    }
}

/// Record value for a view field; camelCase names fall back to the snake_case column.
fn lookup<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    record
        .get(field)
        .or_else(|| record.get(&to_kebab_case(field).replace('-', "_")))
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `YYYY-MM-DD` for dates and timestamps; other strings pass through.
fn format_date(v: &Value) -> Value {
    let Some(s) = v.as_str() else {
        return if v.is_null() { Value::String(String::new()) } else { v.clone() };
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Value::String(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    match s.get(..10).map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d")) {
        Some(Ok(d)) => Value::String(d.format("%Y-%m-%d").to_string()),
        _ => Value::String(s.to_string()),
    }
}

pub fn format_cell(kind: CellKind, value: Option<&Value>) -> Value {
    match (kind, value) {
        (CellKind::Boolean, v) => Value::String(if v.map_or(false, truthy) { "Yes" } else { "No" }.into()),
        (CellKind::Date, Some(v)) => format_date(v),
        (CellKind::Date, None) => Value::String(String::new()),
        (CellKind::Text, v) => v.cloned().unwrap_or(Value::Null),
    }
}

fn coerce_number(label: &str, v: &Value) -> Result<Value, AppError> {
    let err = || AppError::Validation(format!("{} must be a number", label));
    match v {
        Value::Number(_) => Ok(v.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Value::from(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(err)
        }
        _ => Err(err()),
    }
}

fn coerce_checkbox(label: &str, v: &Value) -> Result<Value, AppError> {
    match v {
        Value::Bool(_) => Ok(v.clone()),
        Value::String(s) => match s.as_str() {
            "true" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(AppError::Validation(format!("{} must be true or false", label))),
        },
        _ => Err(AppError::Validation(format!("{} must be true or false", label))),
    }
}

impl PageView {
    /// View for a schema table under a template. Write actions need both the template view and
    /// the table permission.
    pub fn from_table(table: &TableSchema, template: &ModuleTemplate) -> Self {
        let mut fields: Vec<&SchemaField> = table.fields.iter().collect();
        fields.sort_by_key(|f| f.order);
        let columns = fields
            .iter()
            .filter(|f| f.display_in_list)
            .map(|f| ViewColumn {
                field: f.name.clone(),
                label: f.label.clone(),
                cell: cell_kind(f.field_type.kind),
            })
            .collect();
        let form = fields
            .iter()
            .filter(|f| f.editable && f.name != "id" && f.name != "createdAt")
            .map(|f| form_field(f))
            .collect();
        let search_fields = fields.iter().filter(|f| f.searchable).map(|f| f.name.clone()).collect();
        let (views, perms) = (template.views, table.permissions);
        let actions = [
            (views.create && perms.create, ViewAction::Create),
            (views.edit && perms.update, ViewAction::Edit),
            (views.delete && perms.delete, ViewAction::Delete),
        ]
        .into_iter()
        .filter_map(|(on, a)| on.then_some(a))
        .collect();
        PageView {
            title: table.label.clone(),
            description: if table.description.is_empty() {
                format!("Manage {}", table.label.to_lowercase())
            } else {
                table.description.clone()
            },
            template: template.id.clone(),
            data_source: Some(table.name.clone()),
            columns,
            form,
            search_fields,
            actions,
        }
    }

    /// Placeholder view for a template module with no backing table.
    pub fn custom(name: &str, description: &str, template: &ModuleTemplate, data_source: Option<String>) -> Self {
        PageView {
            title: name.to_string(),
            description: description.to_string(),
            template: template.id.clone(),
            data_source,
            columns: Vec::new(),
            form: Vec::new(),
            search_fields: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Structural checks for page files.
    pub fn check(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Page title is required".into()));
        }
        if let Some(f) = self.form.iter().find(|f| f.input == InputKind::Select && f.options.is_empty()) {
            return Err(AppError::Validation(format!("{} has no options", f.name)));
        }
        Ok(())
    }

    pub fn can(&self, action: ViewAction) -> bool {
        self.actions.contains(&action)
    }

    /// Case-insensitive substring match over the search fields. Views without search fields
    /// match everything.
    pub fn matches(&self, record: &Record, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() || self.search_fields.is_empty() {
            return true;
        }
        self.search_fields.iter().any(|f| {
            lookup(record, f)
                .filter(|v| !v.is_null())
                .map_or(false, |v| plain(v).to_lowercase().contains(&term))
        })
    }

    pub fn filter_rows<'a>(&self, rows: &'a [Record], search: Option<&str>) -> Vec<&'a Record> {
        rows.iter()
            .filter(|r| search.map_or(true, |t| self.matches(r, t)))
            .collect()
    }

    /// List row: formatted cells keyed by column field, plus `id` taken from `id_field`.
    pub fn project_row(&self, record: &Record, id_field: &str) -> Record {
        let mut row = Record::new();
        row.insert("id".into(), record.get(id_field).cloned().unwrap_or(Value::Null));
        for col in &self.columns {
            let value = if col.field == "id" {
                record.get(id_field)
            } else {
                lookup(record, &col.field)
            };
            row.insert(col.field.clone(), format_cell(col.cell, value));
        }
        row
    }

    /// Normalize a form submission: keeps only form fields, parses numbers and checkboxes,
    /// checks required fields and select options. With `partial`, absent fields are not required.
    pub fn validate_submission(&self, body: &Record, partial: bool) -> Result<Record, AppError> {
        let mut out = Record::new();
        for f in &self.form {
            let value = body.get(&f.name);
            if is_blank(value) {
                if f.required && (!partial || value.is_some()) {
                    return Err(AppError::Validation(format!("{} is required", f.label)));
                }
                if value.is_some() {
                    out.insert(f.name.clone(), Value::Null);
                }
                continue;
            }
            let Some(v) = value else { continue };
            let v = match f.input {
                InputKind::Number => coerce_number(&f.label, v)?,
                InputKind::Checkbox => coerce_checkbox(&f.label, v)?,
                InputKind::Select => {
                    let s = plain(v);
                    if !f.options.contains(&s) {
                        return Err(AppError::Validation(format!(
                            "{} must be one of: {}",
                            f.label,
                            f.options.join(", ")
                        )));
                    }
                    Value::String(s)
                }
                _ => v.clone(),
            };
            out.insert(f.name.clone(), v);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::templates::find_template;
    use crate::schema::defaults::default_schema;
    use serde_json::json;

    fn materials_view(template: &str) -> PageView {
        let schema = default_schema();
        PageView::from_table(schema.table("materials").unwrap(), &find_template(template).unwrap())
    }

    fn rec(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn view_from_table() {
        let v = materials_view("crud");
        assert_eq!(v.data_source.as_deref(), Some("materials"));
        let cols: Vec<&str> = v.columns.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(cols, ["id", "name", "quantity", "unit", "cost", "supplier", "createdAt"]);
        assert_eq!(v.columns.last().unwrap().cell, CellKind::Date);
        let unit = v.form.iter().find(|f| f.name == "unit").unwrap();
        assert_eq!(unit.input, InputKind::Select);
        assert!(v.form.iter().all(|f| f.name != "id" && f.name != "createdAt"));
        assert_eq!(v.search_fields, ["name", "description", "supplier"]);
        assert_eq!(v.actions, [ViewAction::Create, ViewAction::Edit, ViewAction::Delete]);
    }

    #[test]
    fn readonly_view_has_no_actions() {
        assert!(materials_view("readonly").actions.is_empty());
    }

    #[test]
    fn search_is_case_insensitive() {
        let v = materials_view("crud");
        let rows = vec![
            rec(json!({"id": 1, "name": "Polymer Pellets"})),
            rec(json!({"id": 2, "name": "Blue Sheet", "supplier": "PolyCorp"})),
            rec(json!({"id": 3, "name": "Ink"})),
        ];
        let hits = v.filter_rows(&rows, Some("POLY"));
        assert_eq!(hits.len(), 2);
        assert_eq!(v.filter_rows(&rows, Some("  ")).len(), 3);
        assert_eq!(v.filter_rows(&rows, None).len(), 3);
    }

    #[test]
    fn cells_are_formatted() {
        assert_eq!(format_cell(CellKind::Boolean, Some(&json!(true))), json!("Yes"));
        assert_eq!(format_cell(CellKind::Boolean, None), json!("No"));
        assert_eq!(
            format_cell(CellKind::Date, Some(&json!("2024-01-15T10:30:00.000Z"))),
            json!("2024-01-15")
        );
        assert_eq!(format_cell(CellKind::Date, Some(&json!("2024-03-02"))), json!("2024-03-02"));
        assert_eq!(format_cell(CellKind::Date, None), json!(""));
    }

    #[test]
    fn project_row_reads_snake_case_timestamps() {
        let v = materials_view("crud");
        let row = v.project_row(
            &rec(json!({"id": 4, "name": "Ink", "created_at": "2024-05-01T08:00:00Z"})),
            "id",
        );
        assert_eq!(row["id"], json!(4));
        assert_eq!(row["createdAt"], json!("2024-05-01"));
        assert_eq!(row["supplier"], Value::Null);
    }

    #[test]
    fn submission_is_normalized() {
        let v = materials_view("crud");
        let body = rec(json!({"name": "Ink", "quantity": "12", "unit": "kg", "cost": "1.5", "extra": 1}));
        let out = v.validate_submission(&body, false).unwrap();
        assert_eq!(out["quantity"], json!(12));
        assert_eq!(out["cost"], json!(1.5));
        assert!(out.get("extra").is_none());
    }

    #[test]
    fn submission_errors() {
        let v = materials_view("crud");
        let missing = rec(json!({"quantity": 1, "unit": "kg", "cost": 1}));
        assert_eq!(v.validate_submission(&missing, false).unwrap_err().to_string(), "Name is required");
        assert!(v.validate_submission(&missing, true).is_ok());

        let bad_unit = rec(json!({"unit": "tons"}));
        assert_eq!(
            v.validate_submission(&bad_unit, true).unwrap_err().to_string(),
            "Unit must be one of: kg, lbs, pieces, liters"
        );
        let bad_number = rec(json!({"quantity": "lots"}));
        assert_eq!(
            v.validate_submission(&bad_number, true).unwrap_err().to_string(),
            "Quantity must be a number"
        );
    }
}
