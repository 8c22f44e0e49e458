//! Dashboard and report aggregates. Lists are fetched concurrently and reduced on every request.

use crate::entity::records::{number, text};
use crate::entity::{EntityDef, EntityKind, EntityModel, Record};
use crate::error::AppError;
use crate::store::EntityStore;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Reverse;
use std::sync::Arc;

const RECENT_TRANSACTIONS: usize = 5;
const RECENT_ACTIVITY: usize = 10;

/// Whole numbers serialize as integers.
fn amount(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetrics {
    pub total_production_runs: usize,
    pub total_units_produced: Value,
    pub total_transactions: usize,
    pub material_inventory_count: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub metrics: ReportMetrics,
    pub recent_transactions: Vec<Record>,
    pub production_data: Vec<Record>,
    pub material_data: Vec<Record>,
}

#[derive(Debug, Default, Serialize)]
pub struct MaterialTypes {
    pub raw: usize,
    pub sheets: usize,
    pub cups: usize,
    pub printed_cups: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_materials: usize,
    pub total_value: Value,
    pub low_stock_items: usize,
    pub active_production_runs: usize,
    pub material_types: MaterialTypes,
}

fn entity(model: &EntityModel, kind: EntityKind) -> Result<Arc<EntityDef>, AppError> {
    model
        .by_kind(kind)
        .ok_or_else(|| AppError::Internal(format!("entity {:?} not registered", kind)))
}

/// Materials at or below their reorder level. Materials without a level are skipped.
pub fn low_stock(materials: &[Record]) -> Vec<Record> {
    materials
        .iter()
        .filter(|m| m.get("reorder_level").map_or(false, |v| !v.is_null()))
        .filter(|m| number(m, "current_stock") <= number(m, "reorder_level"))
        .cloned()
        .collect()
}

pub fn dashboard_stats(materials: &[Record], runs: &[Record]) -> DashboardStats {
    let mut types = MaterialTypes::default();
    for m in materials {
        match text(m, "type") {
            Some("raw_material") => types.raw += 1,
            Some("sheet") => types.sheets += 1,
            Some("cup") => types.cups += 1,
            Some("printed_cup") => types.printed_cups += 1,
            _ => {}
        }
    }
    DashboardStats {
        total_materials: materials.len(),
        total_value: amount(
            materials
                .iter()
                .map(|m| number(m, "current_stock") * number(m, "cost_per_unit"))
                .sum(),
        ),
        low_stock_items: low_stock(materials).len(),
        active_production_runs: runs
            .iter()
            .filter(|r| text(r, "status") == Some("in_progress"))
            .count(),
        material_types: types,
    }
}

/// Newest first by `transaction_date`, falling back to `created_at`.
pub fn recent_activity(mut transactions: Vec<Record>, limit: usize) -> Vec<Record> {
    transactions.sort_by_key(|t| {
        Reverse(
            text(t, "transaction_date")
                .or_else(|| text(t, "created_at"))
                .unwrap_or_default()
                .to_string(),
        )
    });
    transactions.truncate(limit);
    transactions
}

pub struct ReportService;

impl ReportService {
    pub async fn report(store: &dyn EntityStore, model: &EntityModel) -> Result<Report, AppError> {
        let (production, transactions, materials) = (
            entity(model, EntityKind::Production)?,
            entity(model, EntityKind::Transaction)?,
            entity(model, EntityKind::Material)?,
        );
        let (runs, txs, mats) = tokio::try_join!(
            store.list(&production),
            store.list(&transactions),
            store.list(&materials),
        )?;
        Ok(Report {
            metrics: ReportMetrics {
                total_production_runs: runs.len(),
                total_units_produced: amount(runs.iter().map(|r| number(r, "output_quantity")).sum()),
                total_transactions: txs.len(),
                material_inventory_count: amount(mats.iter().map(|m| number(m, "current_stock")).sum()),
            },
            recent_transactions: txs.iter().take(RECENT_TRANSACTIONS).cloned().collect(),
            production_data: runs,
            material_data: mats,
        })
    }

    pub async fn dashboard(store: &dyn EntityStore, model: &EntityModel) -> Result<DashboardStats, AppError> {
        let (materials, production) = (entity(model, EntityKind::Material)?, entity(model, EntityKind::Production)?);
        let (mats, runs) = tokio::try_join!(store.list(&materials), store.list(&production))?;
        Ok(dashboard_stats(&mats, &runs))
    }

    pub async fn low_stock(store: &dyn EntityStore, model: &EntityModel) -> Result<Vec<Record>, AppError> {
        let materials = entity(model, EntityKind::Material)?;
        Ok(low_stock(&store.list(&materials).await?))
    }

    pub async fn recent_activity(store: &dyn EntityStore, model: &EntityModel) -> Result<Vec<Record>, AppError> {
        let transactions = entity(model, EntityKind::Transaction)?;
        Ok(recent_activity(store.list(&transactions).await?, RECENT_ACTIVITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::builtin_entities;
    use crate::store::seed::seed_mock_data;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn report_over_seed_data() {
        let model = EntityModel::new(builtin_entities());
        let store = MemoryStore::new();
        seed_mock_data(&store, &model).unwrap();
        let report = ReportService::report(&store, &model).await.unwrap();
        assert_eq!(report.metrics.total_production_runs, 1);
        assert_eq!(report.metrics.total_units_produced, json!(1900));
        assert_eq!(report.metrics.total_transactions, 2);
        assert_eq!(report.material_data.len(), 3);
        assert!(report.recent_transactions.len() <= 5);
    }

    #[test]
    fn stats_count_types_and_value() {
        let mats = vec![
            rec(json!({"type": "raw_material", "current_stock": 10, "cost_per_unit": 2.5, "reorder_level": 20})),
            rec(json!({"type": "sheet", "current_stock": "4", "cost_per_unit": 1, "reorder_level": 2})),
            rec(json!({"type": "printed_cup", "current_stock": 0})),
        ];
        let runs = vec![rec(json!({"status": "in_progress"})), rec(json!({"status": "completed"}))];
        let s = dashboard_stats(&mats, &runs);
        assert_eq!(s.total_materials, 3);
        assert_eq!(s.total_value, json!(29));
        assert_eq!(s.low_stock_items, 1);
        assert_eq!(s.active_production_runs, 1);
        assert_eq!((s.material_types.raw, s.material_types.sheets, s.material_types.printed_cups), (1, 1, 1));
    }

    #[test]
    fn recent_activity_is_newest_first() {
        let txs = vec![
            rec(json!({"transaction_id": 1, "transaction_date": "2023-07-01"})),
            rec(json!({"transaction_id": 2, "created_at": "2024-01-01T00:00:00.000Z"})),
            rec(json!({"transaction_id": 3, "transaction_date": "2023-08-01"})),
        ];
        let ids: Vec<Value> = recent_activity(txs, 2).iter().map(|t| t["transaction_id"].clone()).collect();
        assert_eq!(ids, [json!(2), json!(3)]);
    }
}
