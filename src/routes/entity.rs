//! Entity CRUD routes plus the production-run flows and design labels.
//! Paths are parameterized; handlers resolve the entity from the first segment on each request,
//! so tables added through the schema API are served without rebuilding the router.

use crate::handlers::entity::{
    create, delete as delete_handler, delete_without_id, list, read, update, update_without_id,
};
use crate::handlers::production::{add_label, complete_run, delete_label, list_labels, start_run, update_label};
use crate::state::AppState;
use axum::{routing::get, routing::post, routing::put, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/:path_segment",
            get(list).post(create).put(update_without_id).delete(delete_without_id),
        )
        .route(
            "/:path_segment/:id",
            get(read).put(update).delete(delete_handler),
        )
        .route("/:path_segment/:id/start", post(start_run))
        .route("/:path_segment/:id/complete", post(complete_run))
        .route("/:path_segment/:id/labels", get(list_labels).post(add_label))
        .route(
            "/:path_segment/:id/labels/:label_id",
            put(update_label).delete(delete_label),
        )
        .with_state(state)
}
