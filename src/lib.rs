//! Inventory ERP: REST backend for materials, batches, transactions, production runs, designs and
//! customers, with a runtime schema registry and a schema-driven module generator.

pub mod entity;
pub mod error;
pub mod extractors;
pub mod generator;
pub mod handlers;
pub mod migration;
pub mod naming;
pub mod pages;
pub mod persist;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod system;

pub use error::{ActionError, AppError, SchemaError};
pub use migration::ensure_entity_tables;
pub use pages::PageStore;
pub use persist::{ensure_database_exists, ensure_sys_tables, Persistence};
pub use routes::{builder_routes, common_routes, entity_routes, system_routes};
pub use settings::{Backend, Environment, Settings};
pub use state::{AppInfo, AppState};
pub use store::{seed::seed_mock_data, EntityStore, MemoryStore, PgStore};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}

/// All routes under `/api`. Static routes take precedence over the entity catch-all.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(common_routes(state.clone()))
        .merge(builder_routes(state.clone()))
        .merge(system_routes(state.clone()))
        .merge(entity_routes(state));
    Router::new().nest("/api", api).fallback(not_found)
}

/// [`app`] wrapped with request tracing, CORS for the browser app and the body size limit.
pub fn app_with_layers(state: AppState, settings: &Settings) -> Router {
    let cors = match HeaderValue::from_str(settings.cors_origin()) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(_) => {
            tracing::warn!(origin = %settings.cors_origin(), "invalid CORS origin, cross-origin requests disabled");
            CorsLayer::new()
        }
    };
    app(state)
        .layer(RequestBodyLimitLayer::new(settings.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
