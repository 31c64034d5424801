//! Route handlers, one module per area.

pub mod catalog;
pub mod dashboard;
pub mod maintenance;
pub mod patients;
pub mod portal;
pub mod results;

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use lab_results_core::UploadedFile;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Routes that need no credentials.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(catalog::public_routes())
        .merge(portal::routes())
}

/// Plain JSON message body.
#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Send `bytes` as a file download.
pub fn attachment(download_name: &str, mime_type: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", download_name.replace('"', ""));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// Text fields and files of a multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    /// Drain a multipart body. File inputs left empty by the browser are skipped.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.insert(name, UploadedFile::new(file_name, bytes.to_vec()));
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed text value; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn required(&self, name: &str) -> ApiResult<String> {
        self.text(name)
            .ok_or_else(|| ApiError::bad_request(format!("El campo {} es obligatorio", name)))
    }

    pub fn parsed<T: std::str::FromStr>(&self, name: &str) -> ApiResult<Option<T>> {
        match self.text(name) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("Valor inválido para {}: {}", name, raw))),
            None => Ok(None),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}
