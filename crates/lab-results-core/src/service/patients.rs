//! Patient operations.

use super::LabService;
use crate::error::{LabError, ServiceResult};
use crate::models::{Patient, PatientDeletion, PatientInput, ResultRecord};

fn duplicate_ci(ci: &str) -> LabError {
    LabError::Duplicate(format!("Ya existe un paciente con CI {}", ci))
}

impl LabService {
    /// Register a patient. The CI must not belong to anyone else.
    pub fn create_patient(&self, input: &PatientInput) -> ServiceResult<Patient> {
        let input = input.normalized();
        input.validate().map_err(LabError::Validation)?;

        if self.db.get_patient_by_ci(&input.ci)?.is_some() {
            return Err(duplicate_ci(&input.ci));
        }

        let patient = self.db.insert_patient(&input).map_err(|e| {
            if e.is_duplicate_of("patients.ci") {
                duplicate_ci(&input.ci)
            } else {
                e.into()
            }
        })?;

        tracing::info!(patient_id = patient.id, "patient registered");
        Ok(patient)
    }

    pub fn get_patient(&self, id: i64) -> ServiceResult<Patient> {
        self.db
            .get_patient(id)?
            .ok_or_else(|| LabError::NotFound(format!("paciente {}", id)))
    }

    pub fn list_patients(&self) -> ServiceResult<Vec<Patient>> {
        Ok(self.db.list_patients()?)
    }

    /// Patients whose name or CI starts with `query`.
    pub fn search_patients(&self, query: &str, limit: usize) -> ServiceResult<Vec<Patient>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.db.search_patients(query, limit)?)
    }

    /// Results owned by a patient, newest first.
    pub fn patient_results(&self, id: i64) -> ServiceResult<Vec<ResultRecord>> {
        self.get_patient(id)?;
        Ok(self.db.list_results_for_patient(id)?)
    }

    /// Edit a patient and refresh the name/CI snapshot on its results.
    pub fn update_patient(&self, id: i64, input: &PatientInput) -> ServiceResult<Patient> {
        let input = input.normalized();
        input.validate().map_err(LabError::Validation)?;

        self.get_patient(id)?;
        if let Some(other) = self.db.get_patient_by_ci(&input.ci)? {
            if other.id != id {
                return Err(duplicate_ci(&input.ci));
            }
        }

        let refreshed = self
            .db
            .update_patient_with_results(id, &input)
            .map_err(|e| {
                if e.is_duplicate_of("patients.ci") {
                    duplicate_ci(&input.ci)
                } else {
                    e.into()
                }
            })?;

        tracing::info!(patient_id = id, results_refreshed = refreshed, "patient updated");
        self.get_patient(id)
    }

    /// Delete a patient, its results and their files.
    ///
    /// Rows go first in one transaction; files are removed afterwards and a
    /// file that is already gone does not stop the deletion.
    pub fn delete_patient(&self, id: i64) -> ServiceResult<PatientDeletion> {
        let patient = self.get_patient(id)?;
        let removed = self.db.delete_patient_cascade(id)?;

        let files_removed = removed
            .iter()
            .filter_map(|result| result.file_name.as_deref())
            .filter(|name| Self::remove_unreferenced(&self.results, name))
            .count();

        let deletion = PatientDeletion {
            patient_name: patient.full_name,
            results_removed: removed.len(),
            files_removed,
        };
        tracing::info!(
            patient_id = id,
            results = deletion.results_removed,
            files = deletion.files_removed,
            "patient deleted"
        );
        Ok(deletion)
    }
}
