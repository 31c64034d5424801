//! Lab test catalog models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patient::non_blank;

/// Category shown for tests without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Image extensions accepted for catalog pictures.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// A single test offered by the laboratory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabTest {
    /// Database ID
    pub id: i64,
    /// Test name (e.g., "HEMOGRAMA")
    pub name: String,
    /// Category (e.g., "HEMATOLOGÍA")
    pub category: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Price in local currency
    pub price: f64,
    /// Stored image file name inside the images file store
    pub image: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl LabTest {
    /// Category used for grouping.
    pub fn display_category(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

/// Catalog fields supplied by staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LabTestInput {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: f64,
}

impl LabTestInput {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            category: None,
            description: None,
            price,
        }
    }

    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            category: non_blank(self.category.as_deref()),
            description: non_blank(self.description.as_deref()),
            price: self.price,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("El nombre de la prueba es obligatorio".into());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("Precio inválido: {}", self.price));
        }
        Ok(())
    }
}

/// Group tests by display category, keeping the input order inside each group.
pub fn group_by_category(tests: Vec<LabTest>) -> BTreeMap<String, Vec<LabTest>> {
    let mut groups: BTreeMap<String, Vec<LabTest>> = BTreeMap::new();
    for test in tests {
        groups
            .entry(test.display_category().to_string())
            .or_default()
            .push(test);
    }
    groups
}
