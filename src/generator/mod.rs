//! Module generation from schema tables and templates, schema/module sync, and page views.

mod module;
mod sync;
mod templates;
mod view;

pub use module::{
    component_name, generate_from_schema, generate_from_template, icon_for_table, permissions_for,
    refresh_from_table, Generated, ModuleConfig, TemplateRequest, GENERATED_ORDER,
};
pub use sync::{sync_schema_modules, SyncResults};
pub use templates::{find_template, module_templates, CustomView, ModuleTemplate, TemplateViews};
pub use view::{format_cell, CellKind, FormField, InputKind, PageView, ViewAction, ViewColumn};
