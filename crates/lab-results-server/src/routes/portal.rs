//! Public result lookup by CI and access code.

use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use lab_results_core::ResultRecord;
use serde::{Deserialize, Serialize};

use super::attachment;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Same message for an unknown CI and a wrong code.
pub const LOOKUP_MISS: &str = "CI o código de acceso incorrecto";

#[derive(Debug, Deserialize)]
pub struct PortalCredentials {
    pub ci: String,
    pub codigo: String,
}

/// What the portal shows a patient. Internal IDs and file names stay hidden.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PortalResult {
    pub numero_orden: String,
    pub paciente: String,
    pub fecha_muestra: Option<NaiveDate>,
    pub archivo_disponible: bool,
}

impl From<ResultRecord> for PortalResult {
    fn from(result: ResultRecord) -> Self {
        let archivo_disponible = result.has_file();
        PortalResult {
            numero_orden: result.order_number,
            paciente: result.patient_name,
            fecha_muestra: result.sample_date,
            archivo_disponible,
        }
    }
}

async fn lookup(
    State(state): State<AppState>,
    Json(credentials): Json<PortalCredentials>,
) -> ApiResult<Json<PortalResult>> {
    let PortalCredentials { ci, codigo } = credentials;
    let found = state
        .with_service(move |s| s.find_result(&ci, &codigo))
        .await?;
    match found {
        Some(result) => Ok(Json(PortalResult::from(result))),
        None => {
            tracing::info!("portal lookup miss");
            Err(ApiError::not_found(LOOKUP_MISS))
        }
    }
}

async fn download(
    State(state): State<AppState>,
    Json(credentials): Json<PortalCredentials>,
) -> ApiResult<Response> {
    let PortalCredentials { ci, codigo } = credentials;
    let download = state
        .with_service(move |s| s.download_by_credentials(&ci, &codigo))
        .await?
        .ok_or_else(|| ApiError::not_found(LOOKUP_MISS))?;
    Ok(attachment(&download.download_name, "application/pdf", download.bytes))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/portal/lookup", post(lookup))
        .route("/portal/download", post(download))
}
