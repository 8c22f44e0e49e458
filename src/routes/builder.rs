//! Schema registry, module generator, page files and runtime views.

use crate::handlers::modules::{list_templates, post_modules};
use crate::handlers::pages::{list_pages, post_pages};
use crate::handlers::schema::{get_schema, post_schema};
use crate::handlers::views::{create_row, delete_row, get_view, list_rows, update_row};
use crate::state::AppState;
use axum::{routing::get, routing::put, Router};

pub fn builder_routes(state: AppState) -> Router {
    Router::new()
        .route("/schema", get(get_schema).post(post_schema))
        .route("/modules", get(list_templates).post(post_modules))
        .route("/pages", get(list_pages).post(post_pages))
        .route("/views/:module_id", get(get_view))
        .route("/views/:module_id/rows", get(list_rows).post(create_row))
        .route("/views/:module_id/rows/:id", put(update_row).delete(delete_row))
        .with_state(state)
}
