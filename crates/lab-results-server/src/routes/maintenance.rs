//! Storage audit and sweep (admin only).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use lab_results_core::{Role, StorageAudit};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub removed: usize,
}

async fn audit(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<StorageAudit>> {
    state.authorize(&headers, Role::Admin).await?;
    Ok(Json(state.with_service(|s| s.audit_storage()).await?))
}

async fn sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SweepReport>> {
    let user = state.authorize(&headers, Role::Admin).await?;
    let removed = state.with_service(|s| s.sweep_unreferenced_files()).await?;
    tracing::info!(by = %user.username, removed, "storage swept");
    Ok(Json(SweepReport { removed }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/maintenance/storage", get(audit))
        .route("/maintenance/storage/sweep", post(sweep))
}
