//! Demo data for the memory backend.

use super::MemoryStore;
use crate::entity::{EntityKind, EntityModel, Record};
use crate::error::AppError;
use serde_json::{json, Value};

fn rows(kind: EntityKind) -> Vec<(i64, Value)> {
    match kind {
        EntityKind::Material => vec![
            (1, json!({
                "name": "Polymer Pellets - Type A", "type": "raw_material",
                "description": "High-quality polymer pellets for injection molding",
                "unit": "kg", "current_stock": 3000.0, "reorder_level": 500.0,
                "cost_per_unit": 2.5, "supplier": "Polymer Supplies Inc",
                "created_at": "2024-01-01T00:00:00.000Z", "updated_at": "2024-01-15T10:30:00.000Z"
            })),
            (2, json!({
                "name": "Polymer Pellets - Type B", "type": "raw_material",
                "description": "Premium polymer pellets with enhanced durability",
                "unit": "kg", "current_stock": 2500.0, "reorder_level": 400.0,
                "cost_per_unit": 3.0, "supplier": "Advanced Materials Co",
                "created_at": "2024-01-01T00:00:00.000Z", "updated_at": "2024-01-15T10:30:00.000Z"
            })),
            (3, json!({
                "name": "Blue Sheet Material", "type": "sheet",
                "description": "0.5mm thickness blue sheet for manufacturing",
                "unit": "rolls", "current_stock": 80.0, "reorder_level": 15.0,
                "cost_per_unit": 45.0, "supplier": "Sheet Materials Ltd",
                "created_at": "2024-01-01T00:00:00.000Z", "updated_at": "2024-01-14T14:20:00.000Z"
            })),
        ],
        EntityKind::Batch => vec![(1, json!({
            "batch_number": "SHEET-2023-07-A", "material_id": 3,
            "material_name": "Blue Sheet Material", "quantity": 100.0, "unit": "rolls",
            "production_date": "2023-07-01", "status": "active",
            "notes": "First batch of blue sheets",
            "created_at": "2023-07-01T00:00:00.000Z", "updated_at": "2023-07-01T00:00:00.000Z"
        }))],
        EntityKind::Transaction => vec![
            (1, json!({
                "type": "in", "reference": "PO-001", "notes": "Weekly stock replenishment",
                "transaction_date": "2024-01-15T10:30:00.000Z",
                "created_at": "2024-01-15T10:30:00.000Z", "updated_at": "2024-01-15T10:30:00.000Z"
            })),
            (2, json!({
                "type": "out", "reference": "SO-002", "notes": "Production order #1234",
                "transaction_date": "2024-01-14T15:45:00.000Z",
                "created_at": "2024-01-14T15:45:00.000Z", "updated_at": "2024-01-14T15:45:00.000Z"
            })),
        ],
        EntityKind::Customer => vec![
            (1, json!({
                "name": "ABC Manufacturing", "contact_person": "John Smith",
                "email": "john@abcmfg.com", "phone": "555-0123",
                "address": "123 Industrial Blvd, City, State 12345", "status": "active",
                "created_at": "2024-01-01T00:00:00.000Z", "updated_at": "2024-01-01T00:00:00.000Z"
            })),
            (2, json!({
                "name": "XYZ Corporation", "contact_person": "Sarah Johnson",
                "email": "sarah@xyzcorp.com", "phone": "555-0456",
                "address": "456 Business Ave, City, State 67890", "status": "active",
                "created_at": "2024-01-01T00:00:00.000Z", "updated_at": "2024-01-01T00:00:00.000Z"
            })),
        ],
        EntityKind::Design => vec![(1, json!({
            "name": "Coffee Shop Brand", "base_cup_material": "12oz Clear Cups",
            "description": "Premium coffee shop branding with logo and contact information",
            "target_weight_g": 11.8, "status": "active",
            "print_labels": [{
                "label_id": 1, "design_name": "Coffee Shop Brand", "version": "v1.2",
                "print_date": "2023-07-15", "notes": "Updated contact information",
                "status": "active", "created_at": "2023-07-15T00:00:00.000Z"
            }],
            "created_at": "2023-06-15T10:00:00.000Z", "updated_at": "2023-06-15T10:00:00.000Z"
        }))],
        EntityKind::Production => vec![(1, json!({
            "reference": "PROD-SHEET-01", "input_material": "Polymer Pellets - Type A",
            "output_material": "Blue Sheet Material", "input_quantity": 2000,
            "output_quantity": 1900, "expected_output": 2000, "efficiency": 95,
            "status": "completed", "operator": "John Smith",
            "start_time": "2024-01-14T08:00:00.000Z", "end_time": "2024-01-14T16:00:00.000Z",
            "created_at": "2024-01-14T08:00:00.000Z", "updated_at": "2024-01-14T16:00:00.000Z"
        }))],
        EntityKind::Dynamic => Vec::new(),
    }
}

/// Load the demo data set into `store` for every built-in entity in `model`.
pub fn seed_mock_data(store: &MemoryStore, model: &EntityModel) -> Result<usize, AppError> {
    let mut count = 0;
    for entity in &model.entities {
        for (id, value) in rows(entity.kind) {
            let record: Record = match value {
                Value::Object(map) => map,
                _ => continue,
            };
            store.put(entity, id, record)?;
            count += 1;
        }
    }
    tracing::info!(records = count, "seeded memory store");
    Ok(count)
}
