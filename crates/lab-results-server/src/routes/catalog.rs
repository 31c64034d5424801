//! Lab test catalog: public listing and staff editing.

use std::collections::BTreeMap;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use lab_results_core::{LabTest, LabTestInput, Role};

use super::{attachment, FormData, Message};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const IMAGE_FIELD: &str = "imagen";

fn image_mime(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

fn lab_test_input(form: &FormData) -> ApiResult<LabTestInput> {
    Ok(LabTestInput {
        name: form.required("nombre")?,
        category: form.text("categoria"),
        description: form.text("descripcion"),
        price: form
            .parsed::<f64>("precio")?
            .ok_or_else(|| ApiError::bad_request("El campo precio es obligatorio"))?,
    })
}

async fn public_catalog(
    State(state): State<AppState>,
) -> ApiResult<Json<BTreeMap<String, Vec<LabTest>>>> {
    Ok(Json(state.with_service(|s| s.catalog_by_category()).await?))
}

async fn catalog_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let lookup = name.clone();
    let bytes = state
        .with_service(move |s| s.read_catalog_image(&lookup))
        .await?;
    let mut response = attachment(&name, image_mime(&name), bytes);
    response.headers_mut().remove(axum::http::header::CONTENT_DISPOSITION);
    Ok(response)
}

async fn list_tests(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<LabTest>>> {
    state.authorize(&headers, Role::Staff).await?;
    Ok(Json(state.with_service(|s| s.list_lab_tests()).await?))
}

async fn create_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<LabTest>)> {
    state.authorize(&headers, Role::Staff).await?;
    let mut form = FormData::read(multipart).await?;
    let input = lab_test_input(&form)?;
    let image = form.take_file(IMAGE_FIELD);

    let test = state.with_service(move |s| s.create_lab_test(&input, image)).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

async fn get_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<LabTest>> {
    state.authorize(&headers, Role::Staff).await?;
    Ok(Json(state.with_service(move |s| s.get_lab_test(id)).await?))
}

async fn update_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<LabTest>> {
    state.authorize(&headers, Role::Staff).await?;
    let mut form = FormData::read(multipart).await?;
    let input = lab_test_input(&form)?;
    let image = form.take_file(IMAGE_FIELD);

    let test = state
        .with_service(move |s| s.update_lab_test(id, &input, image))
        .await?;
    Ok(Json(test))
}

async fn delete_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Message>> {
    state.authorize(&headers, Role::Staff).await?;
    let test = state.with_service(move |s| s.delete_lab_test(id)).await?;
    Ok(Message::new(format!("Prueba {} eliminada", test.name)))
}

/// Anonymous catalog routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(public_catalog))
        .route("/catalog/images/:name", get(catalog_image))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/catalog/tests", get(list_tests).post(create_test))
        .route(
            "/catalog/tests/:id",
            get(get_test).put(update_test).delete(delete_test),
        )
}
