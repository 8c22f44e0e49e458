//! Common routes: liveness, store health, version and deployment info.

use crate::entity::now_iso;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<&'static str>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "healthy",
        timestamp: now_iso(),
        message: "Backend is operational",
        backend: None,
    })
}

async fn db_health(State(state): State<AppState>) -> (StatusCode, Json<HealthBody>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthBody {
                status: "healthy",
                timestamp: now_iso(),
                message: "Database connection successful",
                backend: Some(state.store.backend()),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "store ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthBody {
                    status: "error",
                    timestamp: now_iso(),
                    message: "Database connection failed",
                    backend: None,
                }),
            )
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoBody {
    name: &'static str,
    version: &'static str,
    environment: String,
    backend: &'static str,
    api_base_url: String,
}

async fn info(State(state): State<AppState>) -> Json<InfoBody> {
    Json(InfoBody {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: state.info.environment.clone(),
        backend: state.store.backend(),
        api_base_url: state.info.api_base_url.clone(),
    })
}

/// GET /health, /db-health, /version, /info.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/db-health", get(db_health))
        .route("/version", get(info))
        .route("/info", get(info))
        .with_state(state)
}
