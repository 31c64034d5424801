//! Result management and downloads (staff), orphan cleanup (admin).

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use lab_results_core::{DocumentFormat, ResultRecord, ResultSubmission, Role};

use super::{attachment, FormData, Message};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Multipart field carrying the result PDF.
const PDF_FIELD: &str = "archivo_pdf";

async fn list_results(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ResultRecord>>> {
    state.authorize(&headers, Role::Staff).await?;
    Ok(Json(state.with_service(|s| s.list_results()).await?))
}

fn parse_sample_date(form: &FormData) -> ApiResult<Option<NaiveDate>> {
    match form.text("fecha_muestra") {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Fecha de muestra inválida: {}", raw))),
        None => Ok(None),
    }
}

async fn submit_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ResultRecord>)> {
    let user = state.authorize(&headers, Role::Staff).await?;
    let mut form = FormData::read(multipart).await?;

    let patient_id = form
        .parsed::<i64>("paciente_id")?
        .ok_or_else(|| ApiError::bad_request("Debe seleccionar un paciente"))?;
    let submission = ResultSubmission {
        patient_id,
        order_number: form.text("numero_orden"),
        sample_date: parse_sample_date(&form)?,
        file: form.take_file(PDF_FIELD),
    };

    let result = state.with_service(move |s| s.submit_result(submission)).await?;
    tracing::info!(by = %user.username, result_id = result.id, "result uploaded");
    Ok((StatusCode::CREATED, Json(result)))
}

async fn get_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<ResultRecord>> {
    state.authorize(&headers, Role::Staff).await?;
    Ok(Json(state.with_service(move |s| s.get_result(id)).await?))
}

async fn delete_result(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Message>> {
    state.authorize(&headers, Role::Staff).await?;
    let result = state.with_service(move |s| s.delete_result(id)).await?;
    Ok(Message::new(format!(
        "Resultado {} eliminado exitosamente",
        result.order_number
    )))
}

async fn replace_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<ResultRecord>> {
    state.authorize(&headers, Role::Staff).await?;
    let mut form = FormData::read(multipart).await?;
    let file = form.take_file(PDF_FIELD);
    Ok(Json(state.with_service(move |s| s.replace_file(id, file)).await?))
}

async fn download_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    state.authorize(&headers, Role::Staff).await?;
    let download = state.with_service(move |s| s.open_result_file(id)).await?;
    Ok(attachment(&download.download_name, "application/pdf", download.bytes))
}

async fn credentials_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, format)): Path<(i64, String)>,
) -> ApiResult<Response> {
    state.authorize(&headers, Role::Staff).await?;
    let format = DocumentFormat::from_extension(&format)
        .ok_or_else(|| ApiError::not_found(format!("Formato no soportado: {}", format)))?;
    let document = state.with_service(move |s| s.credentials_document(id, format)).await?;
    Ok(attachment(
        &document.download_name,
        document.mime_type,
        document.bytes,
    ))
}

async fn remove_orphan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Message>> {
    let user = state.authorize(&headers, Role::Admin).await?;
    let result = state.with_service(move |s| s.remove_orphaned_result(id)).await?;
    tracing::warn!(by = %user.username, order_number = %result.order_number, "orphaned result removed");
    Ok(Message::new(format!(
        "Registro huérfano {} eliminado",
        result.order_number
    )))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/results", get(list_results).post(submit_result))
        .route("/results/:id", get(get_result).delete(delete_result))
        .route("/results/:id/file", put(replace_file).get(download_file))
        .route("/results/:id/credentials/:format", get(credentials_document))
        .route("/results/:id/orphan", delete(remove_orphan))
}
