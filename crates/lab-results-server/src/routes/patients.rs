//! Patient management (staff).

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use lab_results_core::{Patient, PatientInput, ResultRecord, Role};
use serde::Deserialize;

use super::Message;
use crate::error::ApiResult;
use crate::AppState;

const SEARCH_LIMIT: usize = 50;

/// Patient form fields.
#[derive(Debug, Deserialize)]
pub struct PatientForm {
    pub nombre_completo: String,
    pub ci: String,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<PatientForm> for PatientInput {
    fn from(form: PatientForm) -> Self {
        PatientInput {
            full_name: form.nombre_completo,
            ci: form.ci,
            phone: form.telefono,
            email: form.email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

async fn list_patients(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Patient>>> {
    state.authorize(&headers, Role::Staff).await?;
    let patients = match query.q {
        Some(q) => {
            state
                .with_service(move |s| s.search_patients(&q, SEARCH_LIMIT))
                .await?
        }
        None => state.with_service(|s| s.list_patients()).await?,
    };
    Ok(Json(patients))
}

async fn create_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(form): Json<PatientForm>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    state.authorize(&headers, Role::Staff).await?;
    let input = PatientInput::from(form);
    let patient = state.with_service(move |s| s.create_patient(&input)).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn get_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Patient>> {
    state.authorize(&headers, Role::Staff).await?;
    Ok(Json(state.with_service(move |s| s.get_patient(id)).await?))
}

async fn update_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(form): Json<PatientForm>,
) -> ApiResult<Json<Patient>> {
    state.authorize(&headers, Role::Staff).await?;
    let input = PatientInput::from(form);
    Ok(Json(state.with_service(move |s| s.update_patient(id, &input)).await?))
}

async fn delete_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Message>> {
    state.authorize(&headers, Role::Staff).await?;
    let deletion = state.with_service(move |s| s.delete_patient(id)).await?;
    Ok(Message::new(deletion.summary()))
}

async fn patient_results(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<ResultRecord>>> {
    state.authorize(&headers, Role::Staff).await?;
    Ok(Json(state.with_service(move |s| s.patient_results(id)).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/patients/:id/results", get(patient_results))
}
