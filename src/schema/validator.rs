//! Schema validation: identifier-safe names, unique fields, resolvable references.

use crate::error::SchemaError;
use crate::schema::types::{DatabaseSchema, TableSchema};
use regex::Regex;
use std::collections::HashSet;

/// Path segments already taken by fixed API routes.
const RESERVED: &[&str] = &[
    "schema", "modules", "pages", "views", "reports", "dashboard", "themes", "health", "version",
    "info", "system_config",
];

const IDENTIFIER: &str = r"^[A-Za-z_][A-Za-z0-9_]{0,62}$";

pub fn check_identifier(name: &str) -> Result<(), SchemaError> {
    let re = Regex::new(IDENTIFIER).map_err(|e| SchemaError::Validation(e.to_string()))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate one table against the rest of the schema. `extra_tables` are entity paths that
/// exist outside the schema (built-in entities) and may be referenced.
pub fn validate_table(
    table: &TableSchema,
    schema: &DatabaseSchema,
    extra_tables: &HashSet<String>,
) -> Result<(), SchemaError> {
    if table.name.trim().is_empty() || table.label.trim().is_empty() {
        return Err(SchemaError::MissingNameOrLabel);
    }
    check_identifier(&table.id)?;
    check_identifier(&table.name)?;
    if RESERVED.contains(&table.name.as_str()) {
        return Err(SchemaError::Validation(format!("table name '{}' is reserved", table.name)));
    }

    let mut seen = HashSet::new();
    for f in &table.fields {
        check_identifier(&f.name)?;
        if !seen.insert(f.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                table: table.id.clone(),
                field: f.name.clone(),
            });
        }
        if let Some(pattern) = f.field_type.validation.as_ref().and_then(|v| v.pattern.as_ref()) {
            Regex::new(pattern)
                .map_err(|_| SchemaError::Validation(format!("invalid pattern for field '{}'", f.name)))?;
        }
        if let Some(r) = &f.field_type.reference {
            let known = r.table == table.name
                || schema.tables.iter().any(|t| t.name == r.table)
                || extra_tables.contains(&r.table);
            if !known {
                return Err(SchemaError::UnknownReference {
                    field: f.name.clone(),
                    target: r.table.clone(),
                });
            }
        }
    }

    let duplicates = schema
        .tables
        .iter()
        .filter(|t| t.id == table.id || t.name == table.name)
        .count();
    if duplicates > 1 {
        return Err(SchemaError::Validation(format!("duplicate table '{}'", table.name)));
    }
    Ok(())
}

/// Validate every table.
pub fn validate_schema(schema: &DatabaseSchema, extra_tables: &HashSet<String>) -> Result<(), SchemaError> {
    for t in &schema.tables {
        validate_table(t, schema, extra_tables)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::defaults::{default_fields, default_schema};

    #[test]
    fn default_schema_is_valid() {
        assert!(validate_schema(&default_schema(), &HashSet::new()).is_ok());
    }

    #[test]
    fn rejects_unsafe_names_and_duplicate_fields() {
        assert!(check_identifier("drop table;").is_err());
        assert!(check_identifier("batchNumber").is_ok());

        let mut schema = default_schema();
        let mut t = schema.tables[0].clone();
        t.fields.extend(default_fields());
        schema.tables[0] = t.clone();
        assert!(matches!(
            validate_table(&t, &schema, &HashSet::new()),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn references_must_resolve() {
        let mut schema = default_schema();
        schema.tables.retain(|t| t.id != "materials");
        let t = schema.table("batches").unwrap().clone();
        assert!(matches!(
            validate_table(&t, &schema, &HashSet::new()),
            Err(SchemaError::UnknownReference { .. })
        ));
        let extra: HashSet<String> = ["materials".to_string()].into();
        assert!(validate_table(&t, &schema, &extra).is_ok());
    }
}
