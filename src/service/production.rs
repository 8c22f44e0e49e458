//! Production run start/complete flows. Every write of one flow goes through `write_all`.

use crate::entity::records::{number, text};
use crate::entity::{now_iso, EntityDef, EntityKind, EntityModel, Record};
use crate::error::AppError;
use crate::store::{EntityStore, WriteOp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct StartRun {
    #[serde(default)]
    pub start_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRun {
    pub output_quantity: f64,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// Records written by a flow, in write order.
#[derive(Debug, Serialize)]
pub struct FlowOutcome {
    pub run: Record,
    pub transaction: Record,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<Record>,
}

pub struct ProductionService;

struct Entities {
    production: Arc<EntityDef>,
    materials: Arc<EntityDef>,
    transactions: Arc<EntityDef>,
    batches: Arc<EntityDef>,
}

impl Entities {
    fn resolve(model: &EntityModel) -> Result<Self, AppError> {
        let get = |kind| {
            model
                .by_kind(kind)
                .ok_or_else(|| AppError::Internal(format!("entity {:?} not registered", kind)))
        };
        Ok(Entities {
            production: get(EntityKind::Production)?,
            materials: get(EntityKind::Material)?,
            transactions: get(EntityKind::Transaction)?,
            batches: get(EntityKind::Batch)?,
        })
    }
}

/// Material id for a run's `input_material` / `output_material` name.
async fn resolve_material(
    store: &dyn EntityStore,
    materials: &EntityDef,
    run: &Record,
    field: &str,
) -> Result<Value, AppError> {
    let name = text(run, field)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("production run has no {}", field)))?;
    let found = store
        .find_by(materials, "name", &Value::String(name.to_string()))
        .await?;
    found
        .first()
        .and_then(|m| m.get(&materials.id_field).cloned())
        .ok_or_else(|| AppError::BadRequest(format!("Unknown material: {}", name)))
}

fn run_id(production: &EntityDef, run: &Record) -> String {
    run.get(&production.id_field)
        .and_then(crate::entity::id_string)
        .unwrap_or_default()
}

fn already_completed() -> AppError {
    AppError::BadRequest("Production run is already completed".into())
}

fn object(v: Value) -> Record {
    match v {
        Value::Object(m) => m,
        _ => Record::new(),
    }
}

impl ProductionService {
    /// Mark a run `in_progress` and record the input material usage.
    pub async fn start(
        store: &dyn EntityStore,
        model: &EntityModel,
        id: &str,
        req: StartRun,
    ) -> Result<FlowOutcome, AppError> {
        let e = Entities::resolve(model)?;
        let run = store
            .get(&e.production, id)
            .await?
            .ok_or_else(|| AppError::NotFound(e.production.not_found()))?;
        match text(&run, "status").unwrap_or("planned") {
            "planned" | "paused" => {}
            "completed" => return Err(already_completed()),
            "in_progress" => {
                return Err(AppError::BadRequest("Production run is already in progress".into()))
            }
            other => {
                return Err(AppError::BadRequest(format!(
                    "Production run cannot be started while {}",
                    other
                )))
            }
        }
        let material_id = resolve_material(store, &e.materials, &run, "input_material").await?;
        let start_time = req.start_time.unwrap_or_else(now_iso);
        let reference = text(&run, "reference").unwrap_or_default().to_string();
        let rid = run_id(&e.production, &run);

        let ops = vec![
            WriteOp::Update {
                entity: e.production.clone(),
                id: id.to_string(),
                patch: object(json!({"status": "in_progress", "start_time": start_time})),
            },
            WriteOp::Insert {
                entity: e.transactions.clone(),
                record: object(json!({
                    "type": "usage",
                    "material_id": material_id,
                    "quantity": number(&run, "input_quantity"),
                    "reference_id": format!("prod-{}", rid),
                    "reference": reference,
                    "notes": format!("Input for production run {}", reference),
                    "transaction_date": start_time,
                })),
            },
        ];
        let mut written = store.write_all(ops).await?.into_iter();
        let run = written.next().unwrap_or_default();
        let transaction = written.next().unwrap_or_default();
        tracing::info!(run = %rid, "production run started");
        Ok(FlowOutcome { run, transaction, batch: None })
    }

    /// Mark a run `completed`, derive efficiency, book the output and open a batch for it.
    pub async fn complete(
        store: &dyn EntityStore,
        model: &EntityModel,
        id: &str,
        req: CompleteRun,
    ) -> Result<FlowOutcome, AppError> {
        if !req.output_quantity.is_finite() || req.output_quantity < 0.0 {
            return Err(AppError::Validation("output_quantity must be at least 0".into()));
        }
        let e = Entities::resolve(model)?;
        let run = store
            .get(&e.production, id)
            .await?
            .ok_or_else(|| AppError::NotFound(e.production.not_found()))?;
        if text(&run, "status") == Some("completed") {
            return Err(already_completed());
        }
        let material_id = resolve_material(store, &e.materials, &run, "output_material").await?;
        let end_time = req.end_time.unwrap_or_else(now_iso);
        let production_date = end_time.get(..10).unwrap_or(&end_time).to_string();
        let reference = text(&run, "reference").unwrap_or_default().to_string();
        let output_material = text(&run, "output_material").unwrap_or_default().to_string();
        let rid = run_id(&e.production, &run);

        let ops = vec![
            WriteOp::Update {
                entity: e.production.clone(),
                id: id.to_string(),
                patch: object(json!({
                    "status": "completed",
                    "output_quantity": req.output_quantity,
                    "end_time": end_time,
                })),
            },
            WriteOp::Insert {
                entity: e.transactions.clone(),
                record: object(json!({
                    "type": "in",
                    "material_id": material_id,
                    "quantity": req.output_quantity,
                    "reference_id": format!("prod-{}", rid),
                    "reference": reference,
                    "notes": format!("Output from production run {}", reference),
                    "transaction_date": end_time,
                })),
            },
            WriteOp::Insert {
                entity: e.batches.clone(),
                record: object(json!({
                    "material_id": material_id,
                    "material_name": output_material,
                    "batch_number": format!("BATCH-{}", reference),
                    "quantity": req.output_quantity,
                    "production_date": production_date,
                    "status": "active",
                })),
            },
        ];
        let mut written = store.write_all(ops).await?.into_iter();
        let run = written.next().unwrap_or_default();
        let transaction = written.next().unwrap_or_default();
        let batch = written.next();
        tracing::info!(run = %rid, efficiency = ?run.get("efficiency"), "production run completed");
        Ok(FlowOutcome { run, transaction, batch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::builtin_entities;
    use crate::store::seed::seed_mock_data;
    use crate::store::MemoryStore;

    fn setup() -> (MemoryStore, EntityModel) {
        let model = EntityModel::new(builtin_entities());
        let store = MemoryStore::new();
        seed_mock_data(&store, &model).unwrap();
        (store, model)
    }

    async fn new_run(store: &MemoryStore, model: &EntityModel, output_material: &str) -> String {
        let p = model.by_kind(EntityKind::Production).unwrap();
        let run = store
            .insert(
                &p,
                object(json!({
                    "reference": "PROD-T1",
                    "input_material": "Polymer Pellets - Type A",
                    "output_material": output_material,
                    "input_quantity": 2000,
                    "expected_output": 2000,
                    "status": "planned",
                })),
            )
            .await
            .unwrap();
        run["production_id"].to_string()
    }

    #[tokio::test]
    async fn complete_writes_run_transaction_and_batch() {
        let (store, model) = setup();
        let id = new_run(&store, &model, "Blue Sheet Material").await;
        let out = ProductionService::complete(
            &store,
            &model,
            &id,
            CompleteRun { output_quantity: 1900.0, end_time: Some("2024-02-01T16:00:00.000Z".into()) },
        )
        .await
        .unwrap();
        assert_eq!(out.run["efficiency"], json!(95));
        assert_eq!(out.transaction["material_id"], json!(3));
        let batch = out.batch.unwrap();
        assert_eq!(batch["batch_number"], json!("BATCH-PROD-T1"));
        assert_eq!(batch["production_date"], json!("2024-02-01"));
    }

    #[tokio::test]
    async fn unknown_output_material_writes_nothing() {
        let (store, model) = setup();
        let id = new_run(&store, &model, "Nonexistent").await;
        let t = model.by_kind(EntityKind::Transaction).unwrap();
        let before = store.list(&t).await.unwrap().len();
        let err = ProductionService::complete(
            &store,
            &model,
            &id,
            CompleteRun { output_quantity: 10.0, end_time: None },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(store.list(&t).await.unwrap().len(), before);
        let p = model.by_kind(EntityKind::Production).unwrap();
        let run = store.get(&p, &id).await.unwrap().unwrap();
        assert_eq!(run["status"], json!("planned"));
    }

    #[tokio::test]
    async fn start_records_usage() {
        let (store, model) = setup();
        let id = new_run(&store, &model, "Blue Sheet Material").await;
        let out = ProductionService::start(&store, &model, &id, StartRun::default()).await.unwrap();
        assert_eq!(out.run["status"], json!("in_progress"));
        assert_eq!(out.transaction["type"], json!("usage"));
        assert_eq!(out.transaction["material_id"], json!(1));
        assert_eq!(out.transaction["quantity"], json!(2000.0));
    }
}
