//! Result submission, replacement, deletion, lookup and downloads.

use chrono::{NaiveDate, Utc};

use super::LabService;
use crate::credentials::{CredentialIssuer, CredentialSource};
use crate::db::DbError;
use crate::error::{LabError, ServiceResult};
use crate::export::{render_credentials, DocumentFormat, RenderedDocument};
use crate::models::{
    NewResultRecord, Patient, ResultDownload, ResultRecord, ResultSubmission, UploadedFile,
};
use crate::storage::{sanitize_file_name, StoredFile};

/// Insert retries after a UNIQUE rejection on an issued value.
const MAX_INSERT_ATTEMPTS: usize = 5;

/// Longest order number accepted from staff.
pub const MAX_ORDER_NUMBER_LEN: usize = 50;

fn require_pdf(file: Option<UploadedFile>) -> ServiceResult<UploadedFile> {
    let file = match file {
        Some(file) if !file.file_name.trim().is_empty() => file,
        _ => return Err(LabError::Validation("Debe seleccionar un archivo PDF".into())),
    };
    if !file.is_pdf() {
        return Err(LabError::Validation(format!(
            "Solo se permiten archivos PDF (recibido: {})",
            file.file_name
        )));
    }
    Ok(file)
}

fn supplied_order(order_number: Option<&str>) -> ServiceResult<Option<String>> {
    let Some(order) = order_number.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if order.chars().count() > MAX_ORDER_NUMBER_LEN {
        return Err(LabError::Validation(format!(
            "El número de orden no puede superar {} caracteres",
            MAX_ORDER_NUMBER_LEN
        )));
    }
    Ok(Some(order.to_string()))
}

impl LabService {
    /// Validate, store the file, issue credentials and persist a new result.
    ///
    /// Nothing touches the disk before validation passes. Any failure after
    /// the file is stored removes it (and its backup) before returning.
    pub fn submit_result(&self, submission: ResultSubmission) -> ServiceResult<ResultRecord> {
        self.submit_result_with(submission, &CredentialIssuer::new(&self.db))
    }

    fn submit_result_with(
        &self,
        submission: ResultSubmission,
        credentials: &dyn CredentialSource,
    ) -> ServiceResult<ResultRecord> {
        let patient = self.get_patient(submission.patient_id)?;
        let file = require_pdf(submission.file)?;
        let supplied_order = supplied_order(submission.order_number.as_deref())?;

        let order_number = match &supplied_order {
            Some(order) => order.clone(),
            None => credentials.order_number()?,
        };

        let stored = self.results.store(&order_number, &file.file_name, &file.bytes)?;

        let persisted = self.persist_result(
            credentials,
            &patient,
            &stored,
            order_number,
            supplied_order.is_some(),
            submission.sample_date,
        );
        match persisted {
            Ok(record) => {
                tracing::info!(
                    result_id = record.id,
                    order_number = %record.order_number,
                    patient_id = patient.id,
                    "result submitted"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::error!(error = %e, file = %stored.name, "result submission failed, rolling back file");
                Self::discard_stored(&self.results, &stored.name);
                Err(e)
            }
        }
    }

    fn persist_result(
        &self,
        credentials: &dyn CredentialSource,
        patient: &Patient,
        stored: &StoredFile,
        mut order_number: String,
        order_supplied: bool,
        sample_date: Option<NaiveDate>,
    ) -> ServiceResult<ResultRecord> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let record = NewResultRecord {
                order_number: order_number.clone(),
                patient_id: Some(patient.id),
                patient_name: patient.full_name.clone(),
                patient_ci: patient.ci.clone(),
                sample_date,
                file_name: Some(stored.name.clone()),
                file_checksum: Some(stored.checksum.clone()),
                access_code: credentials.access_code()?,
                created_at: Utc::now(),
            };

            match self.db.insert_result(&record) {
                Ok(inserted) => return Ok(inserted),
                Err(e) if attempts < MAX_INSERT_ATTEMPTS && e.is_duplicate_of("results.access_code") => {
                    tracing::warn!(attempts, "access code collided on insert, reissuing");
                }
                Err(e)
                    if attempts < MAX_INSERT_ATTEMPTS
                        && !order_supplied
                        && e.is_duplicate_of("results.order_number") =>
                {
                    tracing::warn!(attempts, order_number = %order_number, "order number collided on insert, reissuing");
                    order_number = credentials.order_number()?;
                }
                Err(e) if e.is_duplicate_of("results.order_number") => {
                    return Err(LabError::Duplicate(format!(
                        "El número de orden {} ya existe",
                        order_number
                    )));
                }
                Err(e) if e.is_duplicate_of("results.access_code") => {
                    return Err(LabError::Duplicate(
                        "No se pudo emitir un código de acceso único".into(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn get_result(&self, id: i64) -> ServiceResult<ResultRecord> {
        self.db
            .get_result(id)?
            .ok_or_else(|| LabError::NotFound(format!("resultado {}", id)))
    }

    /// All results, newest first.
    pub fn list_results(&self) -> ServiceResult<Vec<ResultRecord>> {
        Ok(self.db.list_results()?)
    }

    /// Swap the file of a result.
    ///
    /// The new file is stored and referenced before the old one is deleted,
    /// so a failure at any step leaves the result pointing at a real file.
    pub fn replace_file(&self, id: i64, file: Option<UploadedFile>) -> ServiceResult<ResultRecord> {
        let current = self.get_result(id)?;
        let file = require_pdf(file)?;

        let stored = self.results.store(&current.order_number, &file.file_name, &file.bytes)?;

        let updated = match self.db.update_result_file(id, &stored.name, &stored.checksum) {
            Ok(true) => Ok(()),
            Ok(false) => Err(LabError::NotFound(format!("resultado {}", id))),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = updated {
            tracing::error!(result_id = id, error = %e, "file replacement failed, rolling back");
            Self::discard_stored(&self.results, &stored.name);
            return Err(e);
        }

        if let Some(old) = current.file_name.as_deref() {
            Self::remove_unreferenced(&self.results, old);
        }

        tracing::info!(result_id = id, file = %stored.name, "result file replaced");
        self.get_result(id)
    }

    /// Delete one result and then its file.
    pub fn delete_result(&self, id: i64) -> ServiceResult<ResultRecord> {
        let result = self.get_result(id)?;
        if !self.db.delete_result(id)? {
            return Err(LabError::NotFound(format!("resultado {}", id)));
        }

        if let Some(name) = result.file_name.as_deref() {
            Self::remove_unreferenced(&self.results, name);
        }

        tracing::info!(result_id = id, order_number = %result.order_number, "result deleted");
        Ok(result)
    }

    /// Public lookup by CI and access code.
    ///
    /// Both values are trimmed, then matched exactly. A miss is `Ok(None)`.
    pub fn find_result(&self, ci: &str, access_code: &str) -> ServiceResult<Option<ResultRecord>> {
        let ci = ci.trim();
        let access_code = access_code.trim();
        if ci.is_empty() || access_code.is_empty() {
            return Ok(None);
        }
        Ok(self.db.find_result_by_credentials(ci, access_code)?)
    }

    /// Read the stored file of a result for download.
    ///
    /// A missing primary copy is restored from the backup. When both copies are
    /// gone the result is reported as [`LabError::FileMissing`].
    pub fn open_result_file(&self, id: i64) -> ServiceResult<ResultDownload> {
        let result = self.get_result(id)?;
        self.read_result_file(&result)
    }

    fn read_result_file(&self, result: &ResultRecord) -> ServiceResult<ResultDownload> {
        let name = result.file_name.as_deref().ok_or_else(|| {
            LabError::FileMissing(format!("del resultado {}", result.order_number))
        })?;

        let bytes = self.results.read(name).map_err(|e| {
            tracing::warn!(result_id = result.id, file = %name, error = %e, "result file unavailable");
            LabError::from(e)
        })?;

        Ok(ResultDownload {
            download_name: result_download_name(result),
            bytes,
        })
    }

    /// Portal download: the file of the result matching CI and access code.
    pub fn download_by_credentials(
        &self,
        ci: &str,
        access_code: &str,
    ) -> ServiceResult<Option<ResultDownload>> {
        match self.find_result(ci, access_code)? {
            Some(result) => self.read_result_file(&result).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a result whose file no longer exists anywhere.
    ///
    /// Refuses with a validation error when the file is still present.
    pub fn remove_orphaned_result(&self, id: i64) -> ServiceResult<ResultRecord> {
        let result = self.get_result(id)?;
        if let Some(name) = result.file_name.as_deref() {
            if self.results.exists(name) || self.results.backup_exists(name) {
                return Err(LabError::Validation(format!(
                    "El resultado {} todavía tiene su archivo; use la eliminación normal",
                    result.order_number
                )));
            }
        }

        if !self.db.delete_result(id)? {
            return Err(DbError::NotFound(format!("resultado {}", id)).into());
        }
        tracing::warn!(result_id = id, order_number = %result.order_number, "orphaned result removed");
        Ok(result)
    }

    /// Render the access-credentials document of a result.
    pub fn credentials_document(
        &self,
        id: i64,
        format: DocumentFormat,
    ) -> ServiceResult<RenderedDocument> {
        let result = self.get_result(id)?;
        Ok(render_credentials(&result, &self.profile, format)?)
    }
}

/// `{order}_{patient name}.pdf`, reduced to a safe file name.
pub fn result_download_name(result: &ResultRecord) -> String {
    sanitize_file_name(&format!("{}_{}.pdf", result.order_number, result.patient_name))
}
