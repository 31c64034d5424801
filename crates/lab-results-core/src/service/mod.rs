//! Result lifecycle service.
//!
//! `LabService` owns the database and both file stores and is the only place
//! where a database write and a file write happen together. Every operation
//! either completes or leaves no partial state behind: files stored for a
//! failed operation are removed before the error is returned.

mod catalog;
mod dashboard;
mod maintenance;
mod patients;
mod results;
mod users;

pub use dashboard::{DashboardStats, MonthlyCount, MONTH_LABELS};
pub use maintenance::StorageAudit;
pub use users::check_password;

use crate::config::{LabProfile, ServiceConfig};
use crate::db::Database;
use crate::error::ServiceResult;
use crate::storage::FileStore;

/// Orchestrates patients, results, the catalog and staff accounts.
pub struct LabService {
    db: Database,
    results: FileStore,
    images: FileStore,
    profile: LabProfile,
}

impl LabService {
    /// Build the service from its configuration and an opened database.
    pub fn open(config: &ServiceConfig, db: Database) -> ServiceResult<Self> {
        let results = FileStore::open(&config.results_dir, config.backup_dir.as_ref())?;
        let images = FileStore::open(&config.images_dir, None)?;

        tracing::info!(
            results_dir = %config.results_dir.display(),
            backup = results.backup_root().is_some(),
            images_dir = %config.images_dir.display(),
            "lab service ready"
        );

        Ok(Self::new(db, results, images, config.profile.clone()))
    }

    pub fn new(db: Database, results: FileStore, images: FileStore, profile: LabProfile) -> Self {
        Self {
            db,
            results,
            images,
            profile,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn profile(&self) -> &LabProfile {
        &self.profile
    }

    pub fn results_store(&self) -> &FileStore {
        &self.results
    }

    pub fn images_store(&self) -> &FileStore {
        &self.images
    }

    /// Remove a file stored for an operation that did not complete.
    fn discard_stored(store: &FileStore, name: &str) {
        match store.remove(name) {
            Ok(_) => tracing::debug!(file = %name, "discarded stored file"),
            Err(e) => tracing::error!(file = %name, error = %e, "failed to discard stored file"),
        }
    }

    /// Remove a file that a committed change no longer references.
    ///
    /// Returns whether any copy was actually deleted.
    fn remove_unreferenced(store: &FileStore, name: &str) -> bool {
        match store.remove(name) {
            Ok(removal) => {
                if !removal.any() {
                    tracing::warn!(file = %name, "file was already missing");
                }
                removal.primary
            }
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "failed to remove file");
                false
            }
        }
    }
}
