//! Lab Results Server
//!
//! HTTP surface over [`lab_results_core::LabService`]:
//!
//! - Public: catalog, catalog images, portal lookup and download by CI + access code
//! - Staff (HTTP Basic): patients, results, credentials documents, catalog editing, dashboard
//! - Admin: orphaned result cleanup and storage maintenance

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::{Arc, Mutex};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use lab_results_core::{LabService, ServiceResult};
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult, INTERNAL_MESSAGE};

/// Run blocking work on tokio's blocking pool.
pub async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "blocking task failed");
        ApiError::internal(INTERNAL_MESSAGE)
    })?
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<Mutex<LabService>>,
    max_upload: usize,
}

impl AppState {
    pub fn new(service: LabService, max_upload: usize) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            max_upload,
        }
    }

    /// Run `f` with the service locked, on the blocking pool.
    ///
    /// Database calls, file writes and document rendering all block, so they
    /// never run on an async worker.
    pub async fn with_service<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&LabService) -> ServiceResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.service);
        run_blocking(move || {
            let service = service.lock().map_err(|e| {
                tracing::error!(error = %e, "service lock poisoned");
                ApiError::internal(INTERNAL_MESSAGE)
            })?;
            f(&service).map_err(ApiError::from)
        })
        .await
    }

    pub fn max_upload(&self) -> usize {
        self.max_upload
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.max_upload;
    Router::new()
        .merge(routes::public_routes())
        .merge(routes::patients::routes())
        .merge(routes::results::routes())
        .merge(routes::catalog::routes())
        .merge(routes::dashboard::routes())
        .merge(routes::maintenance::routes())
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_results_core::{Database, LabError, ServiceConfig};

    fn state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let service = LabService::open(&ServiceConfig::under(dir.path()), db).unwrap();
        (dir, AppState::new(service, 1024))
    }

    #[tokio::test]
    async fn test_service_work_runs_off_the_async_thread() {
        let (_dir, state) = state();
        let caller = std::thread::current().id();

        let worker = state
            .with_service(|_| Ok(std::thread::current().id()))
            .await
            .unwrap();
        assert_ne!(worker, caller);
    }

    #[tokio::test]
    async fn test_with_service_maps_errors() {
        let (_dir, state) = state();
        let err = state
            .with_service(|_| -> ServiceResult<()> { Err(LabError::NotFound("paciente 9".into())) })
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }
}
