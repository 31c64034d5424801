//! Credential document export (PDF and RTF).

mod pdf;
mod rtf;
mod sheet;

pub use pdf::render_pdf;
pub use rtf::{escape_rtf, render_rtf};
pub use sheet::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LabProfile;
use crate::models::ResultRecord;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format of a credential document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Rtf,
}

impl DocumentFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Rtf => "rtf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Rtf => "application/rtf",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "rtf" => Some(DocumentFormat::Rtf),
            _ => None,
        }
    }
}

/// A rendered document ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub download_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render the access credentials of `result`.
pub fn render_credentials(
    result: &ResultRecord,
    profile: &LabProfile,
    format: DocumentFormat,
) -> ExportResult<RenderedDocument> {
    let sheet = CredentialSheet::build(result, profile);
    let bytes = match format {
        DocumentFormat::Pdf => render_pdf(&sheet)?,
        DocumentFormat::Rtf => render_rtf(&sheet),
    };

    Ok(RenderedDocument {
        download_name: credentials_download_name(result, format),
        mime_type: format.mime_type(),
        bytes,
    })
}

/// `Credenciales_{Name_With_Underscores}_{order}.{ext}`, reduced to a safe file name.
pub fn credentials_download_name(result: &ResultRecord, format: DocumentFormat) -> String {
    let name = result.patient_name.split_whitespace().collect::<Vec<_>>().join("_");
    crate::storage::sanitize_file_name(&format!(
        "Credenciales_{}_{}.{}",
        name,
        result.order_number,
        format.extension()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_result() -> ResultRecord {
        ResultRecord {
            id: 3,
            order_number: "ORD-20240306-143005".into(),
            patient_id: Some(1),
            patient_name: "José  Pérez".into(),
            patient_ci: "1234567".into(),
            sample_date: None,
            file_name: None,
            file_checksum: None,
            access_code: "AB3D9F2K".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 6, 14, 30, 5).unwrap(),
        }
    }

    #[test]
    fn test_download_name() {
        let result = sample_result();
        assert_eq!(
            credentials_download_name(&result, DocumentFormat::Pdf),
            "Credenciales_Jose_Perez_ORD-20240306-143005.pdf"
        );
        assert_eq!(
            credentials_download_name(&result, DocumentFormat::Rtf),
            "Credenciales_Jose_Perez_ORD-20240306-143005.rtf"
        );
    }

    #[test]
    fn test_rtf_rendering_is_deterministic() {
        let result = sample_result();
        let profile = LabProfile::default();

        let a = render_credentials(&result, &profile, DocumentFormat::Rtf).unwrap();
        let b = render_credentials(&result, &profile, DocumentFormat::Rtf).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mime_type, "application/rtf");
    }

    #[test]
    fn test_pdf_rendering() {
        let doc = render_credentials(&sample_result(), &LabProfile::default(), DocumentFormat::Pdf)
            .unwrap();
        assert!(doc.bytes.starts_with(b"%PDF"));
        assert_eq!(doc.mime_type, "application/pdf");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("rtf"), Some(DocumentFormat::Rtf));
        assert_eq!(DocumentFormat::from_extension("docx"), None);
    }
}
