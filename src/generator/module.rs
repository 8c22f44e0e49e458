//! Module descriptors generated from schema tables or templates.

use crate::entity::Record;
use crate::error::AppError;
use crate::generator::templates::{find_template, ModuleTemplate};
use crate::generator::view::PageView;
use crate::naming::{module_slug, squash, strip_plural};
use crate::schema::types::TableSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Navigation entry. `settings` is free-form; generated modules carry `tableId`, `template`,
/// `fields`, `permissions`, `displaySettings`, `relationships` and, once synced, `lastSynced`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub id: String,
    pub name: String,
    pub path: String,
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Record>,
}

/// Generated modules go after the built-in navigation.
pub const GENERATED_ORDER: i64 = 999;

impl ModuleConfig {
    fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.as_ref().and_then(|s| s.get(key))
    }

    pub fn table_id(&self) -> Option<&str> {
        self.setting("tableId").and_then(Value::as_str)
    }

    pub fn template_id(&self) -> Option<&str> {
        self.setting("template").and_then(Value::as_str)
    }

    pub fn last_synced(&self) -> Option<&str> {
        self.setting("lastSynced").and_then(Value::as_str)
    }
}

pub fn icon_for_table(name: &str) -> &'static str {
    match name {
        "users" | "customers" => "Users",
        "materials" => "Package",
        "batches" => "Layers",
        "transactions" => "ArrowRightLeft",
        "products" => "ShoppingCart",
        "orders" => "FileText",
        "suppliers" => "Truck",
        "inventory" => "Warehouse",
        "reports" => "BarChart3",
        "settings" => "Settings",
        _ => "Package",
    }
}

/// `view_<table>`, `add_<singular>`, `edit_<singular>`, `delete_<singular>` for each granted
/// operation, in that order.
pub fn permissions_for(table: &TableSchema) -> Vec<String> {
    let p = table.permissions;
    let base = strip_plural(&table.name);
    let mut out = Vec::new();
    if p.read {
        out.push(format!("view_{}", table.name));
    }
    if p.create {
        out.push(format!("add_{}", base));
    }
    if p.update {
        out.push(format!("edit_{}", base));
    }
    if p.delete {
        out.push(format!("delete_{}", base));
    }
    out
}

pub fn component_name(label: &str) -> String {
    format!("{}Page", squash(label))
}

/// Settings block shared by generation and sync.
fn table_settings(table: &TableSchema, settings: &mut Record) -> Result<(), AppError> {
    settings.insert("fields".into(), serde_json::to_value(&table.fields)?);
    settings.insert("permissions".into(), serde_json::to_value(table.permissions)?);
    settings.insert("displaySettings".into(), serde_json::to_value(&table.display_settings)?);
    settings.insert("relationships".into(), serde_json::to_value(&table.relationships)?);
    Ok(())
}

fn template_or_404(id: &str) -> Result<ModuleTemplate, AppError> {
    find_template(id).ok_or_else(|| AppError::NotFound("Template not found".into()))
}

pub struct Generated {
    pub module: ModuleConfig,
    pub view: PageView,
}

impl Generated {
    /// Page file written for the module: `<dir>/page.json` holding the view.
    pub fn files(&self) -> Result<Value, AppError> {
        let dir = self.module.path.trim_start_matches('/');
        Ok(serde_json::json!([{
            "path": format!("{}/page.json", dir),
            "content": serde_json::to_value(&self.view)?,
        }]))
    }
}

pub fn generate_from_schema(table: &TableSchema, template: &str) -> Result<Generated, AppError> {
    let tpl = template_or_404(template)?;
    let mut settings = Record::new();
    settings.insert("tableId".into(), Value::String(table.id.clone()));
    settings.insert("template".into(), Value::String(tpl.id.clone()));
    table_settings(table, &mut settings)?;
    let description = if table.description.is_empty() {
        format!("Manage {}", table.label.to_lowercase())
    } else {
        table.description.clone()
    };
    let module = ModuleConfig {
        id: table.id.clone(),
        name: table.label.clone(),
        path: format!("/{}", table.name),
        icon: icon_for_table(&table.name).to_string(),
        description,
        enabled: true,
        order: GENERATED_ORDER,
        permissions: Some(permissions_for(table)),
        component: Some(component_name(&table.label)),
        settings: Some(settings),
    };
    let view = PageView::from_table(table, &tpl);
    Ok(Generated { module, view })
}

/// Optional overrides accepted by `generate_from_template`.
#[derive(Debug, Default, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub config: Record,
}

pub fn generate_from_template(req: &TemplateRequest) -> Result<Generated, AppError> {
    let tpl = template_or_404(&req.template)?;
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Module name is required".into()));
    }
    let id = module_slug(&req.name);
    let config_str = |key: &str| req.config.get(key).and_then(Value::as_str).map(str::to_string);
    let description = config_str("description").unwrap_or_else(|| format!("{} module", req.name));
    let permissions = match req.config.get("permissions") {
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| AppError::BadRequest(format!("Invalid permissions: {}", e)))?,
        None => vec![format!("view_{}", id), format!("edit_{}", id)],
    };
    let mut settings = Record::new();
    settings.insert("template".into(), Value::String(tpl.id.clone()));
    settings.extend(req.config.clone());
    let module = ModuleConfig {
        id: id.clone(),
        name: req.name.clone(),
        path: format!("/{}", id),
        icon: config_str("icon").unwrap_or_else(|| tpl.icon.clone()),
        description: description.clone(),
        enabled: true,
        order: GENERATED_ORDER,
        permissions: Some(permissions),
        component: Some(component_name(&req.name)),
        settings: Some(settings),
    };
    let view = PageView::custom(&req.name, &description, &tpl, config_str("dataSource"));
    Ok(Generated { module, view })
}

/// Refresh a module from its table; keeps the id, path, icon and order.
pub fn refresh_from_table(table: &TableSchema, existing: &ModuleConfig, now: &str) -> Result<ModuleConfig, AppError> {
    let mut module = existing.clone();
    module.name = table.label.clone();
    if !table.description.is_empty() {
        module.description = table.description.clone();
    }
    module.permissions = Some(permissions_for(table));
    let mut settings = existing.settings.clone().unwrap_or_default();
    table_settings(table, &mut settings)?;
    settings.insert("lastSynced".into(), Value::String(now.to_string()));
    module.settings = Some(settings);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::defaults::default_schema;
    use crate::schema::types::TablePermissions;
    use serde_json::json;

    fn materials() -> TableSchema {
        default_schema().table("materials").unwrap().clone()
    }

    #[test]
    fn permissions_follow_granted_operations() {
        let mut t = materials();
        t.name = "t".into();
        t.permissions = TablePermissions {
            read: true,
            create: true,
            update: false,
            delete: false,
        };
        assert_eq!(permissions_for(&t), vec!["view_t", "add_t"]);

        let t = materials();
        assert_eq!(
            permissions_for(&t),
            vec!["view_materials", "add_material", "edit_material", "delete_material"]
        );
    }

    #[test]
    fn module_from_schema_table() {
        let g = generate_from_schema(&materials(), "crud").unwrap();
        assert_eq!(g.module.id, "materials");
        assert_eq!(g.module.path, "/materials");
        assert_eq!(g.module.icon, "Package");
        assert_eq!(g.module.order, 999);
        assert_eq!(g.module.table_id(), Some("materials"));
        assert_eq!(g.module.template_id(), Some("crud"));
        assert!(g.module.last_synced().is_none());
        let files = g.files().unwrap();
        assert_eq!(files[0]["path"], "materials/page.json");
    }

    #[test]
    fn unknown_template_is_not_found() {
        let err = generate_from_schema(&materials(), "kanban").err().unwrap();
        assert_eq!(err.to_string(), "Template not found");
    }

    #[test]
    fn module_from_template_uses_slug_and_defaults() {
        let req = TemplateRequest {
            name: "Quality Checks".into(),
            template: "readonly".into(),
            config: Record::new(),
        };
        let g = generate_from_template(&req).unwrap();
        assert_eq!(g.module.id, "quality-checks");
        assert_eq!(g.module.icon, "BarChart3");
        assert_eq!(g.module.description, "Quality Checks module");
        assert_eq!(
            g.module.permissions,
            Some(vec!["view_quality-checks".to_string(), "edit_quality-checks".to_string()])
        );
        assert_eq!(g.module.component.as_deref(), Some("QualityChecksPage"));
    }

    #[test]
    fn template_config_overrides() {
        let config = json!({"icon": "Truck", "permissions": ["view_x"], "color": "blue"});
        let req = TemplateRequest {
            name: "Deliveries".into(),
            template: "crud".into(),
            config: config.as_object().unwrap().clone(),
        };
        let g = generate_from_template(&req).unwrap();
        assert_eq!(g.module.icon, "Truck");
        assert_eq!(g.module.permissions, Some(vec!["view_x".to_string()]));
        let settings = g.module.settings.unwrap();
        assert_eq!(settings["template"], "crud");
        assert_eq!(settings["color"], "blue");
    }
}
