//! Entity definitions: built-in inventory entities plus tables added through the schema API.

mod catalog;
mod def;
pub mod records;

pub use catalog::builtin_entities;
pub use def::{id_string, ColumnInfo, EntityDef, EntityKind, EntityModel, SqlType, ValidationRule};

/// One stored entity row. Keys are column names, values are JSON.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2024-01-15T10:30:00.000Z`.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
