//! Service configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Laboratory identity printed on credential documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabProfile {
    /// Laboratory name (document title)
    pub lab_name: String,
    /// City / country line under the title
    pub location: String,
    /// Public portal address patients are sent to
    pub portal_url: String,
}

impl Default for LabProfile {
    fn default() -> Self {
        Self {
            lab_name: "Laboratorio Clínico Pérez".into(),
            location: "Potosí, Bolivia".into(),
            portal_url: "http://localhost:5000".into(),
        }
    }
}

/// Where the service keeps its files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Result PDFs
    pub results_dir: PathBuf,
    /// Redundant copies of result PDFs; `None` disables backups
    pub backup_dir: Option<PathBuf>,
    /// Catalog images
    pub images_dir: PathBuf,
    pub profile: LabProfile,
}

impl ServiceConfig {
    /// Lay out the three directories under one root.
    pub fn under<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        Self {
            results_dir: root.join("resultados"),
            backup_dir: Some(root.join("respaldo")),
            images_dir: root.join("pruebas"),
            profile: LabProfile::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::under("data/uploads")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = ServiceConfig::default();
        assert_eq!(config.results_dir, PathBuf::from("data/uploads/resultados"));
        assert_eq!(config.backup_dir, Some(PathBuf::from("data/uploads/respaldo")));
        assert_eq!(config.images_dir, PathBuf::from("data/uploads/pruebas"));
        assert_eq!(config.profile.location, "Potosí, Bolivia");
    }
}
