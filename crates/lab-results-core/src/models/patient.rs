//! Patient models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Database ID
    pub id: i64,
    /// Full name as printed on credentials
    pub full_name: String,
    /// National ID (cédula de identidad), unique across patients
    pub ci: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Registration timestamp
    pub registered_at: DateTime<Utc>,
}

/// Patient fields supplied by staff on create or edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PatientInput {
    pub full_name: String,
    pub ci: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl PatientInput {
    /// Create input with the required fields.
    pub fn new(full_name: impl Into<String>, ci: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ci: ci.into(),
            phone: None,
            email: None,
        }
    }

    /// Trim every field and drop blank optionals.
    pub fn normalized(&self) -> Self {
        Self {
            full_name: self.full_name.trim().to_string(),
            ci: self.ci.trim().to_string(),
            phone: non_blank(self.phone.as_deref()),
            email: non_blank(self.email.as_deref()),
        }
    }

    /// Check required fields. Expects normalized input.
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.is_empty() {
            return Err("El nombre del paciente es obligatorio".into());
        }
        if self.ci.is_empty() {
            return Err("El CI del paciente es obligatorio".into());
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(format!("Email inválido: {}", email));
            }
        }
        Ok(())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_trims_and_drops_blanks() {
        let mut input = PatientInput::new("  Ana Quispe ", " 1234567 ");
        input.phone = Some("   ".into());
        input.email = Some(" ana@example.com ".into());

        let normalized = input.normalized();
        assert_eq!(normalized.full_name, "Ana Quispe");
        assert_eq!(normalized.ci, "1234567");
        assert_eq!(normalized.phone, None);
        assert_eq!(normalized.email, Some("ana@example.com".into()));
    }

    #[test]
    fn test_validate() {
        assert!(PatientInput::new("Ana", "123").validate().is_ok());
        assert!(PatientInput::new("", "123").validate().is_err());
        assert!(PatientInput::new("Ana", "").validate().is_err());

        let mut bad_email = PatientInput::new("Ana", "123");
        bad_email.email = Some("not-an-email".into());
        assert!(bad_email.validate().is_err());
    }
}
