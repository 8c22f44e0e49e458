//! Reconcile navigation modules with schema tables.

use crate::error::AppError;
use crate::generator::module::{generate_from_schema, refresh_from_table, ModuleConfig};
use crate::schema::types::TableSchema;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Default, Serialize)]
pub struct SyncResults {
    pub created: Vec<ModuleConfig>,
    pub updated: Vec<ModuleConfig>,
    /// Module ids whose table no longer exists.
    pub removed: Vec<String>,
    /// Table ids whose module is current.
    pub unchanged: Vec<String>,
}

/// RFC 3339, or a date/date-time without offset read as UTC.
fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// A module never synced is stale. Otherwise it is stale when the table changed after the
/// last sync; unreadable timestamps count as current.
fn is_stale(table: &TableSchema, module: &ModuleConfig) -> bool {
    match module.last_synced() {
        None => true,
        Some(last) => match (parse_ts(&table.updated_at), parse_ts(last)) {
            (Some(t), Some(l)) => t > l,
            _ => false,
        },
    }
}

pub fn sync_schema_modules(
    tables: &[TableSchema],
    modules: &[ModuleConfig],
    now: &str,
) -> Result<SyncResults, AppError> {
    let mut results = SyncResults::default();
    let table_modules: Vec<&ModuleConfig> = modules.iter().filter(|m| m.table_id().is_some()).collect();
    for table in tables {
        match table_modules.iter().find(|m| m.table_id() == Some(table.id.as_str())) {
            None => results.created.push(generate_from_schema(table, "crud")?.module),
            Some(m) if is_stale(table, m) => results.updated.push(refresh_from_table(table, m, now)?),
            Some(_) => results.unchanged.push(table.id.clone()),
        }
    }
    let table_ids: HashSet<&str> = tables.iter().map(|t| t.id.as_str()).collect();
    results.removed = table_modules
        .iter()
        .filter(|m| m.table_id().map_or(false, |id| !table_ids.contains(id)))
        .map(|m| m.id.clone())
        .collect();
    Ok(results)
}

impl SyncResults {
    /// Write the outcome into a module list. Created modules are stamped as synced.
    pub fn apply(&self, modules: &mut Vec<ModuleConfig>, now: &str) {
        modules.retain(|m| !self.removed.contains(&m.id));
        for updated in &self.updated {
            if let Some(slot) = modules.iter_mut().find(|m| m.id == updated.id) {
                *slot = updated.clone();
            }
        }
        for created in &self.created {
            if modules.iter().any(|m| m.id == created.id) {
                tracing::warn!(module = %created.id, "module id already taken, skipping");
                continue;
            }
            let mut module = created.clone();
            if let Some(settings) = module.settings.as_mut() {
                settings.insert("lastSynced".into(), now.into());
            }
            modules.push(module);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::defaults::default_schema;
    use serde_json::json;

    const NOW: &str = "2030-01-01T00:00:00.000Z";

    fn synced(table: &TableSchema, last: &str) -> ModuleConfig {
        let mut m = generate_from_schema(table, "crud").unwrap().module;
        m.settings.as_mut().unwrap().insert("lastSynced".into(), json!(last));
        m
    }

    #[test]
    fn classifies_created_updated_unchanged_removed() {
        let mut tables = default_schema().tables;
        tables[0].updated_at = "2024-02-01T00:00:00.000Z".into();
        tables[1].updated_at = "2024-01-01T00:00:00.000Z".into();

        let stale = synced(&tables[0], "2024-01-15T00:00:00.000Z");
        let current = synced(&tables[1], "2024-01-15T00:00:00.000Z");
        let mut orphan = synced(&tables[1], "2024-01-15T00:00:00.000Z");
        orphan.id = "suppliers".into();
        orphan.settings.as_mut().unwrap().insert("tableId".into(), json!("suppliers"));
        let plain = ModuleConfig {
            id: "dashboard".into(),
            name: "Dashboard".into(),
            path: "/".into(),
            icon: "Home".into(),
            description: String::new(),
            enabled: true,
            order: 1,
            permissions: None,
            component: None,
            settings: None,
        };

        let r = sync_schema_modules(&tables, &[stale, current, orphan, plain], NOW).unwrap();
        let created: Vec<&str> = r.created.iter().map(|m| m.id.as_str()).collect();
        let updated: Vec<&str> = r.updated.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(created, ["transactions"]);
        assert_eq!(updated, ["materials"]);
        assert_eq!(r.unchanged, ["batches"]);
        assert_eq!(r.removed, ["suppliers"]);
        assert_eq!(r.updated[0].last_synced(), Some(NOW));
    }

    #[test]
    fn date_only_timestamps_are_compared() {
        let mut tables = default_schema().tables;
        tables[0].updated_at = "2024-02-01".into();
        let m = synced(&tables[0], "2024-01-15T00:00:00.000Z");
        let r = sync_schema_modules(&tables[..1], &[m], NOW).unwrap();
        assert_eq!(r.updated.len(), 1);

        let m = synced(&tables[0], "2024-02-01T10:30:00");
        let r = sync_schema_modules(&tables[..1], &[m], NOW).unwrap();
        assert_eq!(r.unchanged.len(), 1);
    }

    #[test]
    fn never_synced_module_is_updated() {
        let tables = default_schema().tables;
        let m = generate_from_schema(&tables[0], "crud").unwrap().module;
        let r = sync_schema_modules(&tables[..1], &[m], NOW).unwrap();
        assert_eq!(r.updated.len(), 1);
    }

    #[test]
    fn apply_rewrites_module_list() {
        let tables = default_schema().tables;
        let r = sync_schema_modules(&tables, &[], NOW).unwrap();
        let mut modules = Vec::new();
        r.apply(&mut modules, NOW);
        assert_eq!(modules.len(), 3);
        assert!(modules.iter().all(|m| m.last_synced() == Some(NOW)));
        let again = sync_schema_modules(&tables, &modules, NOW).unwrap();
        assert_eq!(again.unchanged.len(), 3);
    }
}
