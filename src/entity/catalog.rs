//! Built-in inventory entities.

use crate::entity::def::{ColumnInfo, EntityDef, EntityKind, SqlType, ValidationRule};
use std::collections::HashMap;

pub const MATERIAL_TYPES: &[&str] = &["raw_material", "sheet", "cup", "printed_cup"];
pub const BATCH_STATUSES: &[&str] = &["active", "in_progress", "completed"];
pub const TRANSACTION_TYPES: &[&str] = &["in", "out", "adjust", "convert", "usage"];
pub const PRODUCTION_STATUSES: &[&str] = &["planned", "in_progress", "completed", "failed", "paused"];
pub const DESIGN_STATUSES: &[&str] = &["active", "inactive", "draft"];
pub const CUSTOMER_STATUSES: &[&str] = &["active", "pending", "inactive"];

struct Builder {
    def: EntityDef,
}

impl Builder {
    fn new(kind: EntityKind, path: &str, singular: &str, table_name: &str) -> Self {
        let id_field = format!("{}_id", singular);
        Builder {
            def: EntityDef {
                kind,
                path: path.to_string(),
                singular: singular.to_string(),
                columns: vec![ColumnInfo::new(&id_field, SqlType::BigSerial).not_null()],
                id_field,
                table_name: table_name.to_string(),
                unique: Vec::new(),
                validation: HashMap::new(),
            },
        }
    }

    fn col(mut self, column: ColumnInfo) -> Self {
        self.def.columns.push(column);
        self
    }

    fn text(self, name: &str) -> Self {
        self.col(ColumnInfo::new(name, SqlType::Text))
    }

    fn number(self, name: &str) -> Self {
        self.col(ColumnInfo::new(name, SqlType::Double))
    }

    fn rule(mut self, field: &str, rule: ValidationRule) -> Self {
        self.def.validation.insert(field.to_string(), rule);
        self
    }

    fn unique(mut self, field: &str) -> Self {
        self.def.unique.push(field.to_string());
        self
    }

    fn build(mut self) -> EntityDef {
        for name in ["created_at", "updated_at"] {
            self.def.columns.push(
                ColumnInfo::new(name, SqlType::Timestamptz)
                    .not_null()
                    .default("NOW()"),
            );
        }
        self.def
    }
}

pub fn builtin_entities() -> Vec<EntityDef> {
    vec![
        Builder::new(EntityKind::Material, "materials", "material", "materials")
            .col(ColumnInfo::new("name", SqlType::Text).not_null())
            .text("type")
            .text("description")
            .text("unit")
            .col(ColumnInfo::new("current_stock", SqlType::Double).default("0"))
            .col(ColumnInfo::new("reorder_level", SqlType::Double).default("0"))
            .col(ColumnInfo::new("cost_per_unit", SqlType::Double).default("0"))
            .text("supplier")
            .col(ColumnInfo::new("design_id", SqlType::BigInt))
            .rule("name", ValidationRule::required())
            .rule("type", ValidationRule::one_of(MATERIAL_TYPES))
            .rule("current_stock", ValidationRule::at_least(0.0))
            .build(),
        Builder::new(EntityKind::Batch, "batches", "batch", "batches")
            .col(ColumnInfo::new("material_id", SqlType::BigInt))
            .text("material_name")
            .text("material_type")
            .col(ColumnInfo::new("batch_number", SqlType::Text).not_null())
            .number("quantity")
            .text("unit")
            .col(ColumnInfo::new("production_date", SqlType::Date))
            .col(ColumnInfo::new("status", SqlType::Text).default("'active'"))
            .text("notes")
            .unique("batch_number")
            .rule("batch_number", ValidationRule::required())
            .rule("status", ValidationRule::one_of(BATCH_STATUSES))
            .rule("quantity", ValidationRule::at_least(0.0))
            .build(),
        Builder::new(EntityKind::Transaction, "transactions", "transaction", "transactions")
            .text("type")
            .col(ColumnInfo::new("material_id", SqlType::BigInt))
            .number("quantity")
            .text("reference_id")
            .text("reference")
            .text("notes")
            .col(ColumnInfo::new("transaction_date", SqlType::Timestamptz).default("NOW()"))
            .rule("type", ValidationRule::one_of(TRANSACTION_TYPES))
            .build(),
        Builder::new(EntityKind::Production, "production", "production", "production_runs")
            .col(ColumnInfo::new("reference", SqlType::Text).not_null())
            .text("input_material")
            .text("output_material")
            .number("input_quantity")
            .number("expected_output")
            .col(ColumnInfo::new("output_quantity", SqlType::Double).default("0"))
            .col(ColumnInfo::new("efficiency", SqlType::Double).default("0"))
            .col(ColumnInfo::new("status", SqlType::Text).default("'planned'"))
            .text("operator")
            .col(ColumnInfo::new("start_time", SqlType::Timestamptz))
            .col(ColumnInfo::new("end_time", SqlType::Timestamptz))
            .rule("reference", ValidationRule::required())
            .rule("status", ValidationRule::one_of(PRODUCTION_STATUSES))
            .build(),
        Builder::new(EntityKind::Design, "designs", "design", "cup_designs")
            .col(ColumnInfo::new("name", SqlType::Text).not_null())
            .text("base_cup_material")
            .text("description")
            .number("target_weight_g")
            .col(ColumnInfo::new("status", SqlType::Text).default("'draft'"))
            .col(ColumnInfo::new("print_labels", SqlType::Jsonb).not_null().default("'[]'::jsonb"))
            .rule("name", ValidationRule::required())
            .rule("status", ValidationRule::one_of(DESIGN_STATUSES))
            .build(),
        Builder::new(EntityKind::Customer, "customers", "customer", "customers")
            .col(ColumnInfo::new("name", SqlType::Text).not_null())
            .text("contact_person")
            .text("email")
            .text("phone")
            .text("address")
            .text("company")
            .col(ColumnInfo::new("status", SqlType::Text).default("'active'"))
            .rule("name", ValidationRule::required())
            .rule(
                "email",
                ValidationRule {
                    format: Some("email".into()),
                    ..Default::default()
                },
            )
            .rule("status", ValidationRule::one_of(CUSTOMER_STATUSES))
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singulars_are_declared_not_derived() {
        let all = builtin_entities();
        let batch = all.iter().find(|e| e.path == "batches").unwrap();
        assert_eq!(batch.singular, "batch");
        assert_eq!(batch.id_field, "batch_id");
        let prod = all.iter().find(|e| e.path == "production").unwrap();
        assert_eq!(prod.id_field, "production_id");
        assert_eq!(prod.table_name, "production_runs");
    }

    #[test]
    fn every_entity_has_timestamps() {
        for e in builtin_entities() {
            assert!(e.column("created_at").is_some(), "{}", e.path);
            assert!(e.column("updated_at").is_some(), "{}", e.path);
        }
    }
}
