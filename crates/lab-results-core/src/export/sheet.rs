//! Content model of the access-credentials document.

use serde::{Deserialize, Serialize};

use crate::config::LabProfile;
use crate::models::ResultRecord;

/// Format of the issue timestamp printed on the sheet.
pub const ISSUED_AT_FORMAT: &str = "%d/%m/%Y %H:%M";

/// One labelled value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetField {
    pub label: String,
    pub value: String,
    /// Printed bold and in the accent colour
    pub emphasized: bool,
}

impl SheetField {
    fn plain(label: &str, value: &str) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            emphasized: false,
        }
    }

    fn emphasized(label: &str, value: &str) -> Self {
        Self {
            emphasized: true,
            ..Self::plain(label, value)
        }
    }
}

/// A titled block of fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetSection {
    pub title: String,
    pub fields: Vec<SheetField>,
}

/// Everything printed on a credentials document, independent of format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialSheet {
    /// Laboratory name, upper-cased
    pub lab_title: String,
    pub location: String,
    pub heading: String,
    pub patient: SheetSection,
    pub credentials: SheetSection,
    pub instructions_title: String,
    pub instructions: Vec<String>,
    /// `Fecha de Emisión: dd/mm/YYYY HH:MM`
    pub issued_line: String,
}

impl CredentialSheet {
    /// Build the sheet for a result.
    ///
    /// Only the result and the profile are read, so equal inputs give equal sheets.
    pub fn build(result: &ResultRecord, profile: &LabProfile) -> Self {
        Self {
            lab_title: profile.lab_name.to_uppercase(),
            location: profile.location.clone(),
            heading: "CREDENCIALES DE ACCESO A RESULTADOS".into(),
            patient: SheetSection {
                title: "INFORMACIÓN DEL PACIENTE".into(),
                fields: vec![
                    SheetField::plain("Nombre Completo:", &result.patient_name),
                    SheetField::plain("Cédula de Identidad:", &result.patient_ci),
                    SheetField::plain("Número de Orden:", &result.order_number),
                ],
            },
            credentials: SheetSection {
                title: "CREDENCIALES DE ACCESO".into(),
                fields: vec![
                    SheetField::plain("CI:", &result.patient_ci),
                    SheetField::emphasized("CÓDIGO DE ACCESO:", &result.access_code),
                ],
            },
            instructions_title: "INSTRUCCIONES".into(),
            instructions: vec![
                format!("1. Ingrese a: {}", profile.portal_url),
                "2. Click en \"Ver mis Resultados\"".into(),
                "3. Ingrese su CI y código de acceso".into(),
                "4. Descargue su resultado en PDF".into(),
            ],
            issued_line: format!(
                "Fecha de Emisión: {}",
                result.created_at.format(ISSUED_AT_FORMAT)
            ),
        }
    }

    pub fn sections(&self) -> [&SheetSection; 2] {
        [&self.patient, &self.credentials]
    }

    /// The sheet as plain lines, in print order.
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.lab_title.clone(),
            self.location.clone(),
            self.heading.clone(),
        ];
        for section in self.sections() {
            lines.push(section.title.clone());
            for field in &section.fields {
                lines.push(format!("{} {}", field.label, field.value));
            }
        }
        lines.push(self.instructions_title.clone());
        lines.extend(self.instructions.iter().cloned());
        lines.push(self.issued_line.clone());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_result() -> ResultRecord {
        ResultRecord {
            id: 7,
            order_number: "ORD-20240306-143005".into(),
            patient_id: Some(1),
            patient_name: "Ana Quispe".into(),
            patient_ci: "1234567".into(),
            sample_date: None,
            file_name: Some("x.pdf".into()),
            file_checksum: None,
            access_code: "AB3D9F2K".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 6, 14, 30, 5).unwrap(),
        }
    }

    #[test]
    fn test_sheet_content() {
        let sheet = CredentialSheet::build(&sample_result(), &LabProfile::default());

        assert_eq!(sheet.lab_title, "LABORATORIO CLÍNICO PÉREZ");
        assert_eq!(sheet.issued_line, "Fecha de Emisión: 06/03/2024 14:30");
        assert_eq!(sheet.instructions[0], "1. Ingrese a: http://localhost:5000");

        let code = &sheet.credentials.fields[1];
        assert_eq!(code.value, "AB3D9F2K");
        assert!(code.emphasized);
    }

    #[test]
    fn test_text_lines_order() {
        let sheet = CredentialSheet::build(&sample_result(), &LabProfile::default());
        let lines = sheet.text_lines();

        assert_eq!(lines.first().map(String::as_str), Some("LABORATORIO CLÍNICO PÉREZ"));
        assert!(lines.contains(&"Nombre Completo: Ana Quispe".to_string()));
        assert!(lines.contains(&"CÓDIGO DE ACCESO: AB3D9F2K".to_string()));
        assert_eq!(lines.last(), Some(&sheet.issued_line));
    }

    #[test]
    fn test_sheet_is_deterministic() {
        let result = sample_result();
        let profile = LabProfile::default();
        assert_eq!(
            CredentialSheet::build(&result, &profile),
            CredentialSheet::build(&result, &profile)
        );
    }
}
