//! Process-wide UI configuration: navigation modules, themes, layout and feature flags.
//! Every setter is followed by a save of the whole document.

mod themes;

pub use themes::{create_custom_theme, default_themes, theme_css, ThemeConfig, ThemeOverrides, Typography};

use crate::entity::Record;
use crate::error::AppError;
use crate::generator::ModuleConfig;
use crate::naming::module_slug;
use crate::persist::{Persistence, SYSTEM_CONFIG_DOCUMENT};
use crate::schema::registry::merge_json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub current: String,
    pub themes: Vec<ThemeConfig>,
    #[serde(default)]
    pub custom_themes: Vec<ThemeConfig>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    pub sidebar_collapsed: bool,
    pub header_height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub dynamic_modules: bool,
    pub visual_editor: bool,
    pub admin_panel: bool,
    pub custom_themes: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub modules: Vec<ModuleConfig>,
    pub theme: ThemeSettings,
    pub layout: LayoutSettings,
    pub features: FeatureFlags,
}

fn nav(id: &str, name: &str, path: &str, icon: &str, description: &str, order: i64) -> ModuleConfig {
    ModuleConfig {
        id: id.into(),
        name: name.into(),
        path: path.into(),
        icon: icon.into(),
        description: description.into(),
        enabled: true,
        order,
        permissions: Some(vec![format!("view_{}", id)]),
        component: None,
        settings: None,
    }
}

/// Navigation entry rendered from a schema table, so schema sync keeps it current.
fn table_nav(id: &str, name: &str, icon: &str, description: &str, order: i64) -> ModuleConfig {
    let mut module = nav(id, name, &format!("/{}", id), icon, description, order);
    let mut settings = Record::new();
    settings.insert("tableId".into(), Value::String(id.into()));
    settings.insert("template".into(), Value::String("crud".into()));
    module.settings = Some(settings);
    module
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            modules: vec![
                nav("dashboard", "Dashboard", "/", "Home", "Overview of inventory and production", 0),
                table_nav("materials", "Materials", "Package", "Raw materials and stock levels", 1),
                table_nav("batches", "Batches", "Layers", "Production batches", 2),
                table_nav("transactions", "Transactions", "ArrowRightLeft", "Stock movements", 3),
                nav("production", "Production", "/production", "Factory", "Production runs", 4),
                nav("designs", "Designs", "/designs", "Palette", "Cup designs and print labels", 5),
                nav("customers", "Customers", "/customers", "Users", "Customer directory", 6),
                nav("reports", "Reports", "/reports", "BarChart3", "Production and inventory reports", 7),
            ],
            theme: ThemeSettings {
                current: "default".into(),
                themes: default_themes(),
                custom_themes: Vec::new(),
            },
            layout: LayoutSettings {
                sidebar_collapsed: false,
                header_height: 64,
            },
            features: FeatureFlags {
                dynamic_modules: true,
                visual_editor: true,
                admin_panel: true,
                custom_themes: true,
            },
        }
    }
}

fn module_not_found() -> AppError {
    AppError::NotFound("Module not found".into())
}

fn invalid_value(key: &str, e: serde_json::Error) -> AppError {
    AppError::BadRequest(format!("Invalid value for {}: {}", key, e))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTheme {
    pub theme_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ModuleRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ModuleUpdate {
    pub id: String,
    pub updates: Record,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomTheme {
    #[serde(default = "default_theme_id")]
    pub base_theme_id: String,
    pub theme: ThemeOverrides,
}

fn default_theme_id() -> String {
    "default".into()
}

impl SystemConfig {
    pub fn find_theme(&self, id: &str) -> Option<&ThemeConfig> {
        self.theme.themes.iter().chain(&self.theme.custom_themes).find(|t| t.id == id)
    }

    pub fn current_theme(&self) -> Option<&ThemeConfig> {
        self.find_theme(&self.theme.current)
    }

    pub fn module(&self, id: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.id == id)
    }

    fn module_mut(&mut self, id: &str) -> Result<&mut ModuleConfig, AppError> {
        self.modules.iter_mut().find(|m| m.id == id).ok_or_else(module_not_found)
    }

    /// Replace one top-level key. The value must have the key's shape.
    pub fn set_key(&mut self, key: &str, value: Value) -> Result<(), AppError> {
        match key {
            "modules" => self.modules = serde_json::from_value(value).map_err(|e| invalid_value(key, e))?,
            "theme" => {
                let theme: ThemeSettings = serde_json::from_value(value).map_err(|e| invalid_value(key, e))?;
                let known = theme.themes.iter().chain(&theme.custom_themes).any(|t| t.id == theme.current);
                if !known {
                    return Err(AppError::BadRequest(format!("Unknown theme: {}", theme.current)));
                }
                self.theme = theme;
            }
            "layout" => self.layout = serde_json::from_value(value).map_err(|e| invalid_value(key, e))?,
            "features" => self.features = serde_json::from_value(value).map_err(|e| invalid_value(key, e))?,
            _ => return Err(AppError::BadRequest(format!("Unknown config key: {}", key))),
        }
        Ok(())
    }

    pub fn set_theme(&mut self, id: &str) -> Result<(), AppError> {
        if self.find_theme(id).is_none() {
            return Err(AppError::NotFound("Theme not found".into()));
        }
        self.theme.current = id.to_string();
        Ok(())
    }

    pub fn add_module(&mut self, module: ModuleConfig) -> Result<ModuleConfig, AppError> {
        if module.id.trim().is_empty() {
            return Err(AppError::BadRequest("Module id is required".into()));
        }
        if self.module(&module.id).is_some() {
            return Err(AppError::Conflict(format!("Module '{}' already exists", module.id)));
        }
        self.modules.push(module.clone());
        Ok(module)
    }

    pub fn update_module(&mut self, id: &str, updates: Record) -> Result<ModuleConfig, AppError> {
        let slot = self.module_mut(id)?;
        *slot = merge_json(&*slot, updates, &["id"])?;
        Ok(slot.clone())
    }

    pub fn remove_module(&mut self, id: &str) -> Result<ModuleConfig, AppError> {
        let idx = self.modules.iter().position(|m| m.id == id).ok_or_else(module_not_found)?;
        Ok(self.modules.remove(idx))
    }

    pub fn toggle_module(&mut self, id: &str) -> Result<ModuleConfig, AppError> {
        let slot = self.module_mut(id)?;
        slot.enabled = !slot.enabled;
        Ok(slot.clone())
    }

    /// Derive a custom theme from `base_theme_id`. The id defaults to the slug of its name.
    pub fn add_custom_theme(&mut self, req: NewCustomTheme) -> Result<ThemeConfig, AppError> {
        let base = self
            .find_theme(&req.base_theme_id)
            .ok_or_else(|| AppError::NotFound("Theme not found".into()))?
            .clone();
        let mut overrides = req.theme;
        let name = overrides
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Theme name is required".into()))?;
        let id = overrides.id.take().unwrap_or_else(|| module_slug(&name));
        if self.find_theme(&id).is_some() {
            return Err(AppError::Conflict(format!("Theme '{}' already exists", id)));
        }
        overrides.id = Some(id);
        let theme = create_custom_theme(&base, overrides);
        self.theme.custom_themes.push(theme.clone());
        Ok(theme)
    }

    pub fn remove_custom_theme(&mut self, id: &str) -> Result<ThemeConfig, AppError> {
        let idx = self
            .theme
            .custom_themes
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| AppError::NotFound("Theme not found".into()))?;
        let removed = self.theme.custom_themes.remove(idx);
        if self.theme.current == id {
            self.theme.current = default_theme_id();
        }
        Ok(removed)
    }
}

/// Shared handle to the configuration document.
#[derive(Clone)]
pub struct SystemState {
    config: Arc<RwLock<SystemConfig>>,
    persistence: Persistence,
}

impl SystemState {
    /// Persisted document, or the defaults when none was saved yet.
    pub async fn load(persistence: Persistence) -> Result<Self, AppError> {
        let config = match persistence.load_document::<SystemConfig>(SYSTEM_CONFIG_DOCUMENT).await? {
            Some(c) => c,
            None => {
                tracing::info!("no saved system config, using defaults");
                SystemConfig::default()
            }
        };
        Ok(SystemState {
            config: Arc::new(RwLock::new(config)),
            persistence,
        })
    }

    pub async fn snapshot(&self) -> SystemConfig {
        self.config.read().await.clone()
    }

    /// Apply `f` to a copy, save it, then publish it. A failed setter or save leaves the
    /// current configuration untouched.
    pub async fn update<T>(&self, f: impl FnOnce(&mut SystemConfig) -> Result<T, AppError>) -> Result<(T, SystemConfig), AppError> {
        let mut guard = self.config.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persistence.save_document(SYSTEM_CONFIG_DOCUMENT, &next).await?;
        *guard = next.clone();
        Ok((out, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_serialize_camel_case() {
        let v = serde_json::to_value(SystemConfig::default()).unwrap();
        assert_eq!(v["theme"]["current"], "default");
        assert_eq!(v["layout"]["headerHeight"], 64);
        assert_eq!(v["features"]["dynamicModules"], true);
        assert!(v["theme"]["customThemes"].as_array().unwrap().is_empty());
        let c = SystemConfig::default();
        assert_eq!(c.module("materials").unwrap().table_id(), Some("materials"));
        assert_eq!(c.module("dashboard").unwrap().table_id(), None);
    }

    #[test]
    fn set_key_checks_shape_and_name() {
        let mut c = SystemConfig::default();
        c.set_key("layout", json!({"sidebarCollapsed": true, "headerHeight": 48})).unwrap();
        assert!(c.layout.sidebar_collapsed);
        assert!(matches!(c.set_key("layout", json!("wide")), Err(AppError::BadRequest(_))));
        assert!(matches!(c.set_key("colors", json!({})), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn theme_and_module_setters() {
        let mut c = SystemConfig::default();
        c.set_theme("ocean").unwrap();
        assert_eq!(c.current_theme().unwrap().name, "Ocean");
        assert!(matches!(c.set_theme("neon"), Err(AppError::NotFound(_))));

        let m = c.toggle_module("reports").unwrap();
        assert!(!m.enabled);
        let dup = c.module("materials").unwrap().clone();
        assert!(matches!(c.add_module(dup), Err(AppError::Conflict(_))));
        let updated = c
            .update_module("materials", json!({"name": "Stock", "id": "x"}).as_object().unwrap().clone())
            .unwrap();
        assert_eq!(updated.id, "materials");
        assert_eq!(updated.name, "Stock");
        c.remove_module("materials").unwrap();
        assert!(matches!(c.remove_module("materials"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn custom_theme_from_base() {
        let mut c = SystemConfig::default();
        let req: NewCustomTheme = serde_json::from_value(json!({
            "baseThemeId": "forest",
            "theme": {"name": "Night Forest", "darkMode": true}
        }))
        .unwrap();
        let t = c.add_custom_theme(req).unwrap();
        assert_eq!(t.id, "night-forest");
        assert_eq!(t.colors["primary"], "hsl(134 61% 41%)");
        c.set_theme("night-forest").unwrap();
        c.remove_custom_theme("night-forest").unwrap();
        assert_eq!(c.theme.current, "default");
    }

    #[tokio::test]
    async fn update_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::File(dir.path().to_path_buf());
        let state = SystemState::load(persistence.clone()).await.unwrap();
        state.update(|c| c.set_theme("dark")).await.unwrap();
        let reloaded = SystemState::load(persistence).await.unwrap();
        assert_eq!(reloaded.snapshot().await.theme.current, "dark");

        let err = state.update(|c| c.set_theme("neon")).await;
        assert!(err.is_err());
        assert_eq!(state.snapshot().await.theme.current, "dark");
    }
}
