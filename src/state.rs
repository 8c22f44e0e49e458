//! Shared application state. The entity model is rebuilt whenever the schema changes so new
//! tables are routable without a restart.

use crate::entity::{EntityDef, EntityModel};
use crate::error::AppError;
use crate::migration::ensure_entity_tables;
use crate::pages::PageStore;
use crate::persist::{Persistence, SCHEMA_DOCUMENT};
use crate::schema::{build_model, builtin_paths, default_schema, validate_schema, DatabaseSchema};
use crate::service::LabelService;
use crate::store::EntityStore;
use crate::system::SystemState;
use sqlx::PgPool;
use std::sync::{Arc, RwLock};

/// Deployment facts reported by `/api/info`.
#[derive(Clone, Debug)]
pub struct AppInfo {
    pub environment: String,
    pub api_base_url: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        AppInfo {
            environment: "development".into(),
            api_base_url: "http://localhost:3000".into(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    /// Swapped as a whole after schema changes.
    model: Arc<RwLock<Arc<EntityModel>>>,
    schema: Arc<tokio::sync::RwLock<DatabaseSchema>>,
    pub system: SystemState,
    pub persistence: Persistence,
    pub pages: PageStore,
    pub labels: Arc<LabelService>,
    pub info: Arc<AppInfo>,
}

impl AppState {
    /// Load the schema and system documents (or their defaults) and build the entity model.
    pub async fn new(
        store: Arc<dyn EntityStore>,
        persistence: Persistence,
        pages: PageStore,
        info: AppInfo,
    ) -> Result<Self, AppError> {
        let schema = match persistence.load_document::<DatabaseSchema>(SCHEMA_DOCUMENT).await? {
            Some(s) => s,
            None => {
                tracing::info!("no saved schema, using the default schema");
                default_schema()
            }
        };
        let model = build_model(&schema);
        let system = SystemState::load(persistence.clone()).await?;
        tracing::info!(entities = model.entities.len(), tables = schema.tables.len(), "application state ready");
        Ok(AppState {
            store,
            model: Arc::new(RwLock::new(Arc::new(model))),
            schema: Arc::new(tokio::sync::RwLock::new(schema)),
            system,
            persistence,
            pages,
            labels: Arc::new(LabelService::default()),
            info: Arc::new(info),
        })
    }

    pub fn model(&self) -> Result<Arc<EntityModel>, AppError> {
        self.model
            .read()
            .map(|m| Arc::clone(&m))
            .map_err(|_| AppError::Internal("entity model lock poisoned".into()))
    }

    /// Entity served at `/api/<path>`.
    pub fn entity(&self, path: &str) -> Result<Arc<EntityDef>, AppError> {
        self.model()?
            .entity_by_path(path)
            .ok_or_else(|| AppError::NotFound(format!("{} not found", path)))
    }

    pub fn pool(&self) -> Option<&PgPool> {
        match &self.persistence {
            Persistence::Postgres(pool) => Some(pool),
            _ => None,
        }
    }

    pub async fn schema(&self) -> DatabaseSchema {
        self.schema.read().await.clone()
    }

    /// Mutate a copy of the schema, validate it, create any new tables, save it, then publish
    /// it together with the rebuilt model. Any failure leaves the current schema in place.
    pub async fn update_schema<T>(
        &self,
        f: impl FnOnce(&mut DatabaseSchema) -> Result<T, AppError>,
    ) -> Result<(T, DatabaseSchema), AppError> {
        let mut guard = self.schema.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        validate_schema(&next, &builtin_paths())?;
        let model = build_model(&next);
        if let Some(pool) = self.pool() {
            ensure_entity_tables(pool, &model).await?;
        }
        self.persistence.save_document(SCHEMA_DOCUMENT, &next).await?;
        {
            let mut current = self
                .model
                .write()
                .map_err(|_| AppError::Internal("entity model lock poisoned".into()))?;
            *current = Arc::new(model);
        }
        *guard = next.clone();
        tracing::info!(version = %next.version, tables = next.tables.len(), "schema updated");
        Ok((out, next))
    }
}
