//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and DDL from an entity definition.

use crate::entity::{ColumnInfo, EntityDef, Record};
use crate::sql::PgBindValue;

/// Quote identifier for PostgreSQL. Identifiers only come from entity definitions.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a parameter and return its placeholder with the column's cast.
    fn push(&mut self, col: &ColumnInfo, v: &serde_json::Value) -> String {
        self.params.push(PgBindValue::for_column(col.sql_type, v));
        placeholder(self.params.len(), col)
    }

    fn push_id(&mut self, id: i64) -> String {
        self.params.push(PgBindValue::text(id.to_string()));
        format!("${}::bigint", self.params.len())
    }
}

fn placeholder(n: usize, col: &ColumnInfo) -> String {
    match col.sql_type.cast() {
        Some(t) => format!("${}::{}", n, t),
        None => format!("${}", n),
    }
}

fn select_column_list(entity: &EntityDef) -> String {
    entity
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn table(entity: &EntityDef) -> String {
    quoted(&entity.table_name)
}

/// Columns written from a record: known, not the id, not the server-managed timestamps.
fn writable<'a>(entity: &'a EntityDef) -> impl Iterator<Item = &'a ColumnInfo> {
    entity
        .columns
        .iter()
        .filter(move |c| c.name != entity.id_field && c.name != "created_at" && c.name != "updated_at")
}

/// All rows ordered by id.
pub fn select_list(entity: &EntityDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(entity),
        table(entity),
        quoted(&entity.id_field)
    );
    q
}

/// One row by id; `for_update` locks it for the surrounding transaction.
pub fn select_by_id(entity: &EntityDef, id: i64, for_update: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_id(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}{}",
        select_column_list(entity),
        table(entity),
        quoted(&entity.id_field),
        ph,
        if for_update { " FOR UPDATE" } else { "" }
    );
    q
}

/// Rows where `column = value`, optionally excluding one id. Used for uniqueness checks and
/// name lookups.
pub fn select_where_eq(
    entity: &EntityDef,
    column: &ColumnInfo,
    value: &serde_json::Value,
    exclude_id: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push(column, value);
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        table(entity),
        quoted(&column.name),
        ph
    );
    if let Some(id) = exclude_id {
        let ph = q.push_id(id);
        sql.push_str(&format!(" AND {} <> {}", quoted(&entity.id_field), ph));
    }
    sql.push_str(&format!(" ORDER BY {}", quoted(&entity.id_field)));
    q.sql = sql;
    q
}

/// INSERT the record's known columns. Columns the record omits take their DB default.
pub fn insert(entity: &EntityDef, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in writable(entity) {
        let Some(v) = record.get(&c.name) else { continue };
        placeholders.push(q.push(c, v));
        cols.push(quoted(&c.name));
    }
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table(entity), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table(entity),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET every known column present in `record`, stamp updated_at.
pub fn update(entity: &EntityDef, id: i64, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in writable(entity) {
        let Some(v) = record.get(&c.name) else { continue };
        let rhs = q.push(c, v);
        sets.push(format!("{} = {}", quoted(&c.name), rhs));
    }
    if entity.column("updated_at").is_some() {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_ph = q.push_id(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table(entity),
        sets.join(", "),
        quoted(&entity.id_field),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id, returning the removed row.
pub fn delete(entity: &EntityDef, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_id(id);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        table(entity),
        quoted(&entity.id_field),
        ph,
        select_column_list(entity)
    );
    q
}

/// `CREATE TABLE IF NOT EXISTS` for the entity, id as primary key plus UNIQUE constraints.
pub fn create_table(entity: &EntityDef) -> String {
    let mut defs: Vec<String> = entity
        .columns
        .iter()
        .map(|c| {
            let mut def = format!("{} {}", quoted(&c.name), c.sql_type.ddl());
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(d) = &c.default {
                def.push_str(" DEFAULT ");
                def.push_str(d);
            }
            def
        })
        .collect();
    defs.push(format!("PRIMARY KEY ({})", quoted(&entity.id_field)));
    for u in &entity.unique {
        defs.push(format!("UNIQUE ({})", quoted(u)));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        table(entity),
        defs.join(",\n  ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{builtin_entities, EntityKind};
    use serde_json::json;

    fn materials() -> EntityDef {
        builtin_entities()
            .into_iter()
            .find(|e| e.kind == EntityKind::Material)
            .unwrap()
    }

    #[test]
    fn insert_binds_known_columns_with_casts() {
        let e = materials();
        let rec = json!({"name": "Pellets", "current_stock": 10, "material_id": 99, "bogus": 1})
            .as_object()
            .unwrap()
            .clone();
        let q = insert(&e, &rec);
        assert!(q.sql.starts_with("INSERT INTO \"materials\" (\"name\", \"current_stock\") VALUES ($1, $2::double precision)"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn update_stamps_updated_at_and_binds_id_last() {
        let e = materials();
        let rec = json!({"name": "X"}).as_object().unwrap().clone();
        let q = update(&e, 4, &rec);
        assert!(q.sql.contains("SET \"name\" = $1, \"updated_at\" = NOW() WHERE \"material_id\" = $2::bigint"));
        assert_eq!(q.params.last(), Some(&PgBindValue::text("4")));
    }

    #[test]
    fn ddl_has_primary_key_and_unique() {
        let batches = builtin_entities()
            .into_iter()
            .find(|e| e.kind == EntityKind::Batch)
            .unwrap();
        let ddl = create_table(&batches);
        assert!(ddl.contains("\"batch_id\" BIGSERIAL NOT NULL"));
        assert!(ddl.contains("PRIMARY KEY (\"batch_id\")"));
        assert!(ddl.contains("UNIQUE (\"batch_number\")"));
    }

    #[test]
    fn quoting_escapes_double_quotes() {
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
    }
}
