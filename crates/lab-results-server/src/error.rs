//! HTTP error responses.

use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lab_results_core::LabError;
use serde::Serialize;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Body of every 500. Server paths and driver errors stay in the log.
pub const INTERNAL_MESSAGE: &str = "Error interno del servidor";

impl From<LabError> for ApiError {
    fn from(e: LabError) -> Self {
        let status = match &e {
            LabError::Validation(_) => StatusCode::BAD_REQUEST,
            LabError::NotFound(_) => StatusCode::NOT_FOUND,
            LabError::Duplicate(_) => StatusCode::CONFLICT,
            LabError::FileMissing(_) => StatusCode::GONE,
            LabError::Storage(_) | LabError::Persistence(_) | LabError::Export(_) => {
                tracing::error!(error = %e, "request failed");
                return Self::internal(INTERNAL_MESSAGE);
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::new(e.status(), format!("Formulario inválido: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorResponse { error: self.message })).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Basic realm=\"laboratorio\""),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LabError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (LabError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (LabError::Duplicate("x".into()), StatusCode::CONFLICT),
            (LabError::FileMissing("x".into()), StatusCode::GONE),
            (LabError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (LabError::Persistence("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let error = ApiError::from(LabError::Storage(
            "I/O error on /srv/lab/resultados/x.pdf: File name too long".into(),
        ));
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, INTERNAL_MESSAGE);

        let error = ApiError::from(LabError::Validation("Precio inválido".into()));
        assert!(error.message.contains("Precio inválido"));
    }

    #[test]
    fn test_unauthorized_challenges() {
        let response = ApiError::unauthorized("x").into_response();
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
