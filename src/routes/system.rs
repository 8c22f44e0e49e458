//! System configuration, theme stylesheets and report aggregates.

use crate::handlers::reports::{dashboard_stats, low_stock, recent_activity, report};
use crate::handlers::system::{get_config, post_config, put_key, theme_stylesheet};
use crate::state::AppState;
use axum::{routing::get, routing::put, Router};

pub fn system_routes(state: AppState) -> Router {
    Router::new()
        .route("/system-config", get(get_config).post(post_config))
        .route("/system-config/:key", put(put_key))
        .route("/themes/:id/css", get(theme_stylesheet))
        .route("/reports", get(report))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/dashboard/low-stock", get(low_stock))
        .route("/dashboard/recent-activity", get(recent_activity))
        .with_state(state)
}
