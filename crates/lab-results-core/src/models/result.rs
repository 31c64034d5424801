//! Result record models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One issued lab result.
///
/// Patient name and CI are a snapshot taken at creation time. They are
/// refreshed when the owning patient is edited, never joined live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultRecord {
    /// Database ID
    pub id: i64,
    /// Unique order number
    pub order_number: String,
    /// Owning patient, if still linked
    pub patient_id: Option<i64>,
    /// Patient name snapshot
    pub patient_name: String,
    /// Patient CI snapshot (half of the public lookup key)
    pub patient_ci: String,
    /// Date the sample was taken
    pub sample_date: Option<NaiveDate>,
    /// Stored file name inside the results file store
    pub file_name: Option<String>,
    /// SHA-256 of the stored file (hex)
    pub file_checksum: Option<String>,
    /// Unique access code (other half of the public lookup key)
    pub access_code: String,
    /// Creation timestamp, also printed as the credential issue date
    pub created_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Whether this record references a stored file.
    pub fn has_file(&self) -> bool {
        self.file_name.is_some()
    }
}

/// Row values for a new result, as handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResultRecord {
    pub order_number: String,
    pub patient_id: Option<i64>,
    pub patient_name: String,
    pub patient_ci: String,
    pub sample_date: Option<NaiveDate>,
    pub file_name: Option<String>,
    pub file_checksum: Option<String>,
    pub access_code: String,
    pub created_at: DateTime<Utc>,
}

impl NewResultRecord {
    /// Attach the database ID assigned on insert.
    pub fn into_record(self, id: i64) -> ResultRecord {
        ResultRecord {
            id,
            order_number: self.order_number,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            patient_ci: self.patient_ci,
            sample_date: self.sample_date,
            file_name: self.file_name,
            file_checksum: self.file_checksum,
            access_code: self.access_code,
            created_at: self.created_at,
        }
    }
}

/// A file received from an upload form.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Client-side file name
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension of the client-side name, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.trim();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn is_pdf(&self) -> bool {
        self.extension().as_deref() == Some("pdf")
    }
}

/// A staff submission of a new result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSubmission {
    pub patient_id: i64,
    /// Blank or missing means "issue one"
    pub order_number: Option<String>,
    pub sample_date: Option<NaiveDate>,
    pub file: Option<UploadedFile>,
}

/// Outcome of deleting a patient and everything it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientDeletion {
    pub patient_name: String,
    pub results_removed: usize,
    pub files_removed: usize,
}

impl PatientDeletion {
    /// Message shown to staff after deletion.
    pub fn summary(&self) -> String {
        format!(
            "Paciente \"{}\" eliminado exitosamente junto con {} resultado(s) y {} archivo(s) PDF",
            self.patient_name, self.results_removed, self.files_removed
        )
    }
}

/// A result file ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDownload {
    pub download_name: String,
    pub bytes: Vec<u8>,
}
