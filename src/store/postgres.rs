//! PostgreSQL entity store. SQL comes from `crate::sql`, one statement per call except
//! updates and `write_all`, which run in a transaction.

use super::{conflict, strip_managed, EntityStore, WriteOp};
use crate::entity::{EntityDef, Record};
use crate::error::AppError;
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, PgConnection, PgPool, Row, TypeInfo};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_id(id: &str) -> Option<i64> {
    id.trim().parse().ok()
}

async fn fetch_all(conn: &mut PgConnection, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    let rows = query.fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(row_to_record).collect())
}

async fn fetch_optional(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<Record>, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    let row = query.fetch_optional(&mut *conn).await?;
    Ok(row.as_ref().map(row_to_record))
}

async fn check_unique(
    conn: &mut PgConnection,
    entity: &EntityDef,
    record: &Record,
    own_id: Option<i64>,
) -> Result<(), AppError> {
    for field in &entity.unique {
        let (Some(col), Some(v)) = (entity.column(field), record.get(field)) else { continue };
        if v.is_null() {
            continue;
        }
        let q = sql::select_where_eq(entity, col, v, own_id);
        if !fetch_all(conn, &q).await?.is_empty() {
            return Err(conflict(entity, field));
        }
    }
    Ok(())
}

async fn insert_on(conn: &mut PgConnection, entity: &EntityDef, mut record: Record) -> Result<Record, AppError> {
    strip_managed(entity, &mut record);
    entity.derive(&mut record);
    check_unique(conn, entity, &record, None).await?;
    let q = sql::insert(entity, &record);
    fetch_optional(conn, &q)
        .await?
        .ok_or_else(|| AppError::Internal(format!("insert into {} returned no row", entity.table_name)))
}

async fn update_on(
    conn: &mut PgConnection,
    entity: &EntityDef,
    id: &str,
    mut patch: Record,
) -> Result<Option<Record>, AppError> {
    let Some(id) = parse_id(id) else {
        return Ok(None);
    };
    let Some(mut record) = fetch_optional(conn, &sql::select_by_id(entity, id, true)).await? else {
        return Ok(None);
    };
    strip_managed(entity, &mut patch);
    record.extend(patch);
    entity.derive(&mut record);
    check_unique(conn, entity, &record, Some(id)).await?;
    fetch_optional(conn, &sql::update(entity, id, &record)).await
}

#[async_trait]
impl EntityStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list(&self, entity: &EntityDef) -> Result<Vec<Record>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn, &sql::select_list(entity)).await
    }

    async fn get(&self, entity: &EntityDef, id: &str) -> Result<Option<Record>, AppError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await?;
        fetch_optional(&mut conn, &sql::select_by_id(entity, id, false)).await
    }

    async fn find_by(
        &self,
        entity: &EntityDef,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, AppError> {
        let Some(col) = entity.column(field) else {
            return Ok(Vec::new());
        };
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn, &sql::select_where_eq(entity, col, value, None)).await
    }

    async fn insert(&self, entity: &EntityDef, body: Record) -> Result<Record, AppError> {
        let mut tx = self.pool.begin().await?;
        let record = insert_on(&mut tx, entity, body).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn update(
        &self,
        entity: &EntityDef,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, AppError> {
        let mut tx = self.pool.begin().await?;
        let record = update_on(&mut tx, entity, id, patch).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn delete(&self, entity: &EntityDef, id: &str) -> Result<Option<Record>, AppError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let mut conn = self.pool.acquire().await?;
        fetch_optional(&mut conn, &sql::delete(entity, id)).await
    }

    async fn write_all(&self, ops: Vec<WriteOp>) -> Result<Vec<Record>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut out = Vec::with_capacity(ops.len());
        for op in ops {
            let record = match op {
                WriteOp::Insert { entity, record } => insert_on(&mut tx, &entity, record).await?,
                WriteOp::Update { entity, id, patch } => update_on(&mut tx, &entity, &id, patch)
                    .await?
                    .ok_or_else(|| AppError::NotFound(entity.not_found()))?,
            };
            out.push(record);
        }
        // Dropping `tx` on an early return rolls back.
        tx.commit().await?;
        Ok(out)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_record(row: &PgRow) -> Record {
    let mut map = Record::new();
    for (idx, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, idx, col.type_info().name()));
    }
    map
}

fn cell_to_value(row: &PgRow, idx: usize, type_name: &str) -> Value {
    fn get<'r, T>(row: &'r PgRow, idx: usize) -> Option<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<Option<T>, _>(idx).ok().flatten()
    }

    let value = match type_name {
        "INT2" => get::<i16>(row, idx).map(Value::from),
        "INT4" => get::<i32>(row, idx).map(Value::from),
        "INT8" => get::<i64>(row, idx).map(Value::from),
        "FLOAT4" => get::<f32>(row, idx).and_then(|n| serde_json::Number::from_f64(n as f64)).map(Value::Number),
        "FLOAT8" => get::<f64>(row, idx).and_then(serde_json::Number::from_f64).map(Value::Number),
        "BOOL" => get::<bool>(row, idx).map(Value::Bool),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|d| Value::String(d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, idx)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())),
        "DATE" => get::<chrono::NaiveDate>(row, idx).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "JSON" | "JSONB" => get::<Value>(row, idx),
        "UUID" => get::<uuid::Uuid>(row, idx).map(|u| Value::String(u.to_string())),
        _ => get::<String>(row, idx).map(Value::String),
    };
    value.unwrap_or(Value::Null)
}
