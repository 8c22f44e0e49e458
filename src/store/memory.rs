//! Process-memory arena: one `BTreeMap<i64, Record>` per entity path behind a single lock.

use super::{conflict, strip_managed, EntityStore, WriteOp};
use crate::entity::{now_iso, EntityDef, Record};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Tables = HashMap<String, BTreeMap<i64, Record>>;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record under a fixed id, as-is. Used for seeding.
    pub fn put(&self, entity: &EntityDef, id: i64, mut record: Record) -> Result<(), AppError> {
        record.insert(entity.id_field.clone(), Value::from(id));
        self.write()?
            .entry(entity.path.clone())
            .or_default()
            .insert(id, record);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AppError> {
        self.tables
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AppError> {
        self.tables
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

fn find_key(table: &BTreeMap<i64, Record>, entity: &EntityDef, id: &str) -> Option<i64> {
    if let Ok(n) = id.parse::<i64>() {
        if table.get(&n).is_some_and(|r| entity.matches_id(r, id)) {
            return Some(n);
        }
    }
    table
        .iter()
        .find(|(_, r)| entity.matches_id(r, id))
        .map(|(k, _)| *k)
}

fn check_unique(
    table: &BTreeMap<i64, Record>,
    entity: &EntityDef,
    record: &Record,
    own_key: Option<i64>,
) -> Result<(), AppError> {
    for field in &entity.unique {
        let Some(v) = record.get(field).filter(|v| !v.is_null()) else { continue };
        let taken = table
            .iter()
            .any(|(k, r)| Some(*k) != own_key && r.get(field) == Some(v));
        if taken {
            return Err(conflict(entity, field));
        }
    }
    Ok(())
}

fn insert_into(tables: &mut Tables, entity: &EntityDef, mut record: Record) -> Result<Record, AppError> {
    let table = tables.entry(entity.path.clone()).or_default();
    strip_managed(entity, &mut record);
    check_unique(table, entity, &record, None)?;
    let id = table.keys().next_back().map_or(1, |k| k + 1);
    let now = now_iso();
    record.insert(entity.id_field.clone(), Value::from(id));
    record.insert("created_at".into(), Value::String(now.clone()));
    record.insert("updated_at".into(), Value::String(now));
    entity.derive(&mut record);
    table.insert(id, record.clone());
    Ok(record)
}

fn update_in(
    tables: &mut Tables,
    entity: &EntityDef,
    id: &str,
    mut patch: Record,
) -> Result<Option<Record>, AppError> {
    let table = tables.entry(entity.path.clone()).or_default();
    let Some(key) = find_key(table, entity, id) else {
        return Ok(None);
    };
    let Some(mut record) = table.get(&key).cloned() else {
        return Ok(None);
    };
    strip_managed(entity, &mut patch);
    record.extend(patch);
    record.insert("updated_at".into(), Value::String(now_iso()));
    entity.derive(&mut record);
    check_unique(table, entity, &record, Some(key))?;
    table.insert(key, record.clone());
    Ok(Some(record))
}

#[async_trait]
impl EntityStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, entity: &EntityDef) -> Result<Vec<Record>, AppError> {
        Ok(self
            .read()?
            .get(&entity.path)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, entity: &EntityDef, id: &str) -> Result<Option<Record>, AppError> {
        let tables = self.read()?;
        let Some(table) = tables.get(&entity.path) else {
            return Ok(None);
        };
        Ok(find_key(table, entity, id).and_then(|k| table.get(&k).cloned()))
    }

    async fn find_by(
        &self,
        entity: &EntityDef,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, AppError> {
        Ok(self
            .read()?
            .get(&entity.path)
            .map(|t| {
                t.values()
                    .filter(|r| r.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, entity: &EntityDef, body: Record) -> Result<Record, AppError> {
        let record = insert_into(&mut *self.write()?, entity, body)?;
        tracing::debug!(entity = %entity.path, id = %record[&entity.id_field], "inserted");
        Ok(record)
    }

    async fn update(
        &self,
        entity: &EntityDef,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, AppError> {
        update_in(&mut *self.write()?, entity, id, patch)
    }

    async fn delete(&self, entity: &EntityDef, id: &str) -> Result<Option<Record>, AppError> {
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(&entity.path) else {
            return Ok(None);
        };
        Ok(find_key(table, entity, id).and_then(|k| table.remove(&k)))
    }

    async fn write_all(&self, ops: Vec<WriteOp>) -> Result<Vec<Record>, AppError> {
        let mut guard = self.write()?;
        // Work on a copy so a failing op leaves the arena untouched.
        let mut staged = guard.clone();
        let mut out = Vec::with_capacity(ops.len());
        for op in ops {
            let record = match op {
                WriteOp::Insert { entity, record } => insert_into(&mut staged, &entity, record)?,
                WriteOp::Update { entity, id, patch } => update_in(&mut staged, &entity, &id, patch)?
                    .ok_or_else(|| AppError::NotFound(entity.not_found()))?,
            };
            out.push(record);
        }
        *guard = staged;
        Ok(out)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{builtin_entities, EntityKind};
    use serde_json::json;
    use std::sync::Arc;

    fn def(kind: EntityKind) -> Arc<EntityDef> {
        Arc::new(builtin_entities().into_iter().find(|e| e.kind == kind).unwrap())
    }

    fn rec(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn ids_are_max_plus_one_and_body_ids_are_ignored() {
        let store = MemoryStore::new();
        let m = def(EntityKind::Material);
        let a = store.insert(&m, rec(json!({"name": "A", "material_id": 50}))).await.unwrap();
        assert_eq!(a["material_id"], json!(1));
        store.put(&m, 9, rec(json!({"name": "seeded"}))).unwrap();
        let b = store.insert(&m, rec(json!({"name": "B"}))).await.unwrap();
        assert_eq!(b["material_id"], json!(10));
    }

    #[tokio::test]
    async fn update_merges_and_keeps_created_at() {
        let store = MemoryStore::new();
        let m = def(EntityKind::Material);
        let a = store.insert(&m, rec(json!({"name": "A", "unit": "kg"}))).await.unwrap();
        let u = store
            .update(&m, "1", rec(json!({"unit": "rolls", "created_at": "x"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(u["name"], json!("A"));
        assert_eq!(u["unit"], json!("rolls"));
        assert_eq!(u["created_at"], a["created_at"]);
        assert!(store.update(&m, "2", Record::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_batch_number_conflicts() {
        let store = MemoryStore::new();
        let b = def(EntityKind::Batch);
        store.insert(&b, rec(json!({"batch_number": "B-1"}))).await.unwrap();
        let err = store.insert(&b, rec(json!({"batch_number": "B-1"}))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn write_all_is_all_or_nothing() {
        let store = MemoryStore::new();
        let t = def(EntityKind::Transaction);
        let p = def(EntityKind::Production);
        let ops = vec![
            WriteOp::Insert { entity: t.clone(), record: rec(json!({"type": "in"})) },
            WriteOp::Update { entity: p.clone(), id: "42".into(), patch: Record::new() },
        ];
        assert!(matches!(store.write_all(ops).await, Err(AppError::NotFound(_))));
        assert!(store.list(&t).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_once() {
        let store = MemoryStore::new();
        let c = def(EntityKind::Customer);
        store.insert(&c, rec(json!({"name": "ACME"}))).await.unwrap();
        assert!(store.delete(&c, "1").await.unwrap().is_some());
        assert!(store.delete(&c, "1").await.unwrap().is_none());
    }
}
