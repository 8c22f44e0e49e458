//! Report and dashboard aggregates, recomputed per request.

use crate::error::AppError;
use crate::response::ok;
use crate::service::ReportService;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};

pub async fn report(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let model = state.model()?;
    Ok(ok(ReportService::report(state.store.as_ref(), &model).await?))
}

pub async fn dashboard_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let model = state.model()?;
    Ok(ok(ReportService::dashboard(state.store.as_ref(), &model).await?))
}

pub async fn low_stock(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let model = state.model()?;
    Ok(ok(ReportService::low_stock(state.store.as_ref(), &model).await?))
}

pub async fn recent_activity(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let model = state.model()?;
    Ok(ok(ReportService::recent_activity(state.store.as_ref(), &model).await?))
}
