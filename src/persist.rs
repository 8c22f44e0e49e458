//! Versioned JSON documents (schema registry, system configuration).
//!
//! Postgres keeps the current payload in `_sys_documents` and every superseded version in
//! `_sys_documents_history`. The memory backend writes `<DATA_DIR>/<id>.json`; tests use
//! `Ephemeral`, which keeps nothing.

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use std::str::FromStr;

pub const SCHEMA_DOCUMENT: &str = "schema";
pub const SYSTEM_CONFIG_DOCUMENT: &str = "system_config";

const DOCUMENTS_TABLE: &str = "_sys_documents";
const DOCUMENTS_HISTORY_TABLE: &str = "_sys_documents_history";

#[derive(Clone, Debug)]
pub enum Persistence {
    Ephemeral,
    File(PathBuf),
    Postgres(PgPool),
}

impl Persistence {
    pub async fn load_document<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, AppError> {
        let payload: Option<serde_json::Value> = match self {
            Persistence::Ephemeral => None,
            Persistence::File(dir) => {
                let path = dir.join(format!("{}.json", id));
                match tokio::fs::read(&path).await {
                    Ok(bytes) => Some(serde_json::from_slice(&bytes)?),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e.into()),
                }
            }
            Persistence::Postgres(pool) => {
                let row: Option<(serde_json::Value,)> =
                    sqlx::query_as(&format!("SELECT payload FROM {} WHERE id = $1", DOCUMENTS_TABLE))
                        .bind(id)
                        .fetch_optional(pool)
                        .await?;
                row.map(|r| r.0)
            }
        };
        match payload {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Store a new version of document `id`. Identical payloads do not create a version.
    pub async fn save_document<T: Serialize>(&self, id: &str, doc: &T) -> Result<(), AppError> {
        let payload = serde_json::to_value(doc)?;
        match self {
            Persistence::Ephemeral => Ok(()),
            Persistence::File(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                let path = dir.join(format!("{}.json", id));
                let tmp = dir.join(format!(".{}.json.tmp", id));
                tokio::fs::write(&tmp, serde_json::to_vec_pretty(&payload)?).await?;
                tokio::fs::rename(&tmp, &path).await?;
                tracing::debug!(document = id, path = %path.display(), "document saved");
                Ok(())
            }
            Persistence::Postgres(pool) => {
                let version = replace_document(pool, id, &payload).await?;
                tracing::debug!(document = id, version, "document saved");
                Ok(())
            }
        }
    }
}

/// Copy the current row to history and write the new payload with version + 1.
/// Returns the version now current.
async fn replace_document(pool: &PgPool, id: &str, payload: &serde_json::Value) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;
    let current: Option<(serde_json::Value, i64)> = sqlx::query_as(&format!(
        "SELECT payload, version FROM {} WHERE id = $1 FOR UPDATE",
        DOCUMENTS_TABLE
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let new_version = match &current {
        Some((old, v)) if old == payload => return Ok(*v),
        Some((_, v)) => v + 1,
        None => 1,
    };

    if current.is_some() {
        sqlx::query(&format!(
            "INSERT INTO {} (id, payload, version, created_at) SELECT id, payload, version, updated_at FROM {} WHERE id = $1",
            DOCUMENTS_HISTORY_TABLE, DOCUMENTS_TABLE
        ))
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(&format!(
        "INSERT INTO {} (id, payload, updated_at, version) VALUES ($1, $2, NOW(), $3) \
         ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload, updated_at = NOW(), version = EXCLUDED.version",
        DOCUMENTS_TABLE
    ))
    .bind(id)
    .bind(payload)
    .bind(new_version)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(new_version)
}

/// Create the document tables if missing.
pub async fn ensure_sys_tables(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            payload JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            version BIGINT NOT NULL DEFAULT 1
        )
        "#,
        DOCUMENTS_TABLE
    ))
    .execute(pool)
    .await?;
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id TEXT NOT NULL,
            payload JSONB NOT NULL,
            version BIGINT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (id, version)
        )
        "#,
        DOCUMENTS_HISTORY_TABLE
    ))
    .execute(pool)
    .await?;
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_name(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", crate::sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// `postgres://u:p@h:5432/inventory_db?x=y` → (`postgres://u:p@h:5432/postgres`, `inventory_db`).
fn split_database_name(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let db_name = url[path_start..].split('?').next().unwrap_or("").trim();
    Ok((format!("{}postgres", &url[..path_start]), db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_database_name_from_url() {
        let (admin, db) = split_database_name("postgres://u:p@localhost:5432/inventory_db?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(db, "inventory_db");
    }

    #[tokio::test]
    async fn file_documents_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let p = Persistence::File(dir.path().join("data"));
        assert!(p.load_document::<serde_json::Value>("schema").await.unwrap().is_none());
        p.save_document("schema", &json!({"version": "1.0.0"})).await.unwrap();
        let back: serde_json::Value = p.load_document("schema").await.unwrap().unwrap();
        assert_eq!(back["version"], "1.0.0");
    }

    #[tokio::test]
    async fn ephemeral_keeps_nothing() {
        let p = Persistence::Ephemeral;
        p.save_document("x", &json!(1)).await.unwrap();
        assert!(p.load_document::<i32>("x").await.unwrap().is_none());
    }
}
