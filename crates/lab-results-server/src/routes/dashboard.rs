//! Back-office dashboard.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use lab_results_core::{DashboardStats, Role};

use crate::error::ApiResult;
use crate::AppState;

async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DashboardStats>> {
    state.authorize(&headers, Role::Staff).await?;
    Ok(Json(state.with_service(|s| s.dashboard()).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}
