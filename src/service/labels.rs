//! Print labels nested in a cup design's `print_labels` array.

use crate::entity::records::{max_id, text, LABEL_STATUSES};
use crate::entity::{id_string, now_iso, EntityDef, Record};
use crate::error::AppError;
use crate::service::crud::into_record;
use crate::store::EntityStore;
use serde_json::Value;

/// Label writes read the design, edit its array and write it back. The lock serializes those
/// read-modify-write cycles within one process.
#[derive(Default)]
pub struct LabelService {
    writes: tokio::sync::Mutex<()>,
}

fn labels_of(design: &Record) -> Vec<Record> {
    design
        .get("print_labels")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default()
}

fn find_label(labels: &[Record], label_id: &str) -> Option<usize> {
    labels
        .iter()
        .position(|l| l.get("label_id").and_then(id_string).as_deref() == Some(label_id))
}

fn check_status(label: &Record) -> Result<(), AppError> {
    match text(label, "status") {
        Some(s) if !LABEL_STATUSES.contains(&s) => Err(AppError::Validation(format!(
            "status must be one of: {}",
            LABEL_STATUSES.join(", ")
        ))),
        _ => Ok(()),
    }
}

async fn load_design(store: &dyn EntityStore, designs: &EntityDef, id: &str) -> Result<Record, AppError> {
    store
        .get(designs, id)
        .await?
        .ok_or_else(|| AppError::NotFound(designs.not_found()))
}

async fn save_labels(
    store: &dyn EntityStore,
    designs: &EntityDef,
    id: &str,
    labels: Vec<Record>,
) -> Result<(), AppError> {
    let mut patch = Record::new();
    patch.insert(
        "print_labels".into(),
        Value::Array(labels.into_iter().map(Value::Object).collect()),
    );
    store
        .update(designs, id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(designs.not_found()))?;
    Ok(())
}

impl LabelService {
    pub async fn list(&self, store: &dyn EntityStore, designs: &EntityDef, id: &str) -> Result<Vec<Record>, AppError> {
        Ok(labels_of(&load_design(store, designs, id).await?))
    }

    pub async fn add(
        &self,
        store: &dyn EntityStore,
        designs: &EntityDef,
        id: &str,
        body: Value,
    ) -> Result<Record, AppError> {
        let _guard = self.writes.lock().await;
        let design = load_design(store, designs, id).await?;
        let mut labels = labels_of(&design);
        let mut label = into_record(body)?;
        label.insert("label_id".into(), Value::from(max_id(labels.iter(), "label_id") + 1));
        label.insert(
            "design_name".into(),
            design.get("name").cloned().unwrap_or(Value::Null),
        );
        label
            .entry("status")
            .or_insert_with(|| Value::String("active".into()));
        label.insert("created_at".into(), Value::String(now_iso()));
        check_status(&label)?;
        labels.push(label.clone());
        save_labels(store, designs, id, labels).await?;
        Ok(label)
    }

    pub async fn update(
        &self,
        store: &dyn EntityStore,
        designs: &EntityDef,
        id: &str,
        label_id: &str,
        body: Value,
    ) -> Result<Record, AppError> {
        let _guard = self.writes.lock().await;
        let design = load_design(store, designs, id).await?;
        let mut labels = labels_of(&design);
        let idx = find_label(&labels, label_id).ok_or_else(|| AppError::NotFound("label not found".into()))?;
        let mut patch = into_record(body)?;
        patch.remove("label_id");
        patch.remove("created_at");
        let label = &mut labels[idx];
        label.extend(patch);
        check_status(label)?;
        let updated = label.clone();
        save_labels(store, designs, id, labels).await?;
        Ok(updated)
    }

    pub async fn delete(
        &self,
        store: &dyn EntityStore,
        designs: &EntityDef,
        id: &str,
        label_id: &str,
    ) -> Result<Record, AppError> {
        let _guard = self.writes.lock().await;
        let design = load_design(store, designs, id).await?;
        let mut labels = labels_of(&design);
        let idx = find_label(&labels, label_id).ok_or_else(|| AppError::NotFound("label not found".into()))?;
        let removed = labels.remove(idx);
        save_labels(store, designs, id, labels).await?;
        Ok(removed)
    }
}
