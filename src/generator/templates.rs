//! Built-in module templates served by `GET /api/modules`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateViews {
    pub list: bool,
    pub detail: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomView {
    pub name: String,
    pub path: String,
    pub component: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub icon: String,
    pub fields: Vec<Value>,
    pub views: TemplateViews,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_views: Option<Vec<CustomView>>,
}

fn template(id: &str, name: &str, description: &str, kind: &str, icon: &str, views: TemplateViews) -> ModuleTemplate {
    ModuleTemplate {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        kind: kind.into(),
        icon: icon.into(),
        fields: Vec::new(),
        views,
        custom_views: None,
    }
}

pub fn module_templates() -> Vec<ModuleTemplate> {
    let all = TemplateViews {
        list: true,
        detail: true,
        create: true,
        edit: true,
        delete: true,
    };
    let read_only = TemplateViews {
        create: false,
        edit: false,
        delete: false,
        ..all
    };
    let none = TemplateViews {
        list: false,
        detail: false,
        ..read_only
    };
    let mut dashboard = template(
        "dashboard",
        "Dashboard Module",
        "Dashboard with widgets and charts",
        "dashboard",
        "Home",
        none,
    );
    dashboard.custom_views = Some(vec![CustomView {
        name: "Dashboard".into(),
        path: "/".into(),
        component: "DashboardView".into(),
    }]);
    vec![
        template(
            "crud",
            "CRUD Module",
            "Standard Create, Read, Update, Delete operations",
            "crud",
            "Package",
            all,
        ),
        template(
            "readonly",
            "Read-Only Module",
            "View-only module for reports and analytics",
            "report",
            "BarChart3",
            read_only,
        ),
        dashboard,
    ]
}

pub fn find_template(id: &str) -> Option<ModuleTemplate> {
    module_templates().into_iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readonly_has_no_write_views() {
        let t = find_template("readonly").unwrap();
        assert!(t.views.list && t.views.detail);
        assert!(!t.views.create && !t.views.edit && !t.views.delete);
        assert!(find_template("kanban").is_none());
    }

    #[test]
    fn dashboard_serializes_custom_view() {
        let v = serde_json::to_value(find_template("dashboard").unwrap()).unwrap();
        assert_eq!(v["type"], "dashboard");
        assert_eq!(v["customViews"][0]["component"], "DashboardView");
    }
}
