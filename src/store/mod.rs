//! Entity storage. Handlers talk to an `EntityStore`; the backend is chosen at start-up.

mod memory;
mod postgres;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entity::{EntityDef, Record};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// One write in a `write_all` batch.
#[derive(Clone, Debug)]
pub enum WriteOp {
    Insert {
        entity: Arc<EntityDef>,
        record: Record,
    },
    Update {
        entity: Arc<EntityDef>,
        id: String,
        patch: Record,
    },
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Short backend name reported by `/api/info`.
    fn backend(&self) -> &'static str;

    async fn list(&self, entity: &EntityDef) -> Result<Vec<Record>, AppError>;

    async fn get(&self, entity: &EntityDef, id: &str) -> Result<Option<Record>, AppError>;

    /// Records whose `field` equals `value`.
    async fn find_by(
        &self,
        entity: &EntityDef,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, AppError>;

    /// Assign an id, stamp timestamps, derive fields and store. Returns the stored record.
    async fn insert(&self, entity: &EntityDef, body: Record) -> Result<Record, AppError>;

    /// Shallow-merge `patch` over the stored record. `None` when there is no such record.
    async fn update(
        &self,
        entity: &EntityDef,
        id: &str,
        patch: Record,
    ) -> Result<Option<Record>, AppError>;

    async fn delete(&self, entity: &EntityDef, id: &str) -> Result<Option<Record>, AppError>;

    /// Apply every op or none. An update of a missing record fails the whole batch with 404.
    async fn write_all(&self, ops: Vec<WriteOp>) -> Result<Vec<Record>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Fields the server owns on every record.
pub(crate) fn strip_managed(entity: &EntityDef, record: &mut Record) {
    record.remove(&entity.id_field);
    record.remove("id");
    record.remove("created_at");
    record.remove("updated_at");
}

pub(crate) fn conflict(entity: &EntityDef, field: &str) -> AppError {
    AppError::Conflict(format!("{} with this {} already exists", entity.singular, field))
}
