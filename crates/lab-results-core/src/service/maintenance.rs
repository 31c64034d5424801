//! Consistency checks between the results table and the results file store.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::LabService;
use crate::error::ServiceResult;
use crate::models::ResultRecord;

/// Inconsistencies between result rows and stored files.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageAudit {
    /// Results whose file is gone from both the primary and backup directory
    pub missing_files: Vec<ResultRecord>,
    /// Results whose primary copy is gone but whose backup survives
    pub restorable: Vec<ResultRecord>,
    /// Stored files no result references, in either directory
    pub unreferenced_files: Vec<String>,
}

impl StorageAudit {
    pub fn is_clean(&self) -> bool {
        self.missing_files.is_empty() && self.restorable.is_empty() && self.unreferenced_files.is_empty()
    }
}

impl LabService {
    /// Compare result rows against the files on disk.
    pub fn audit_storage(&self) -> ServiceResult<StorageAudit> {
        let mut audit = StorageAudit::default();

        for result in self.db.list_results()? {
            let Some(name) = result.file_name.as_deref() else {
                continue;
            };
            if self.results.exists(name) {
                continue;
            }
            if self.results.backup_exists(name) {
                audit.restorable.push(result);
            } else {
                audit.missing_files.push(result);
            }
        }

        let referenced: BTreeSet<String> = self.db.referenced_file_names()?.into_iter().collect();
        let mut on_disk: BTreeSet<String> = self.results.list()?.into_iter().collect();
        on_disk.extend(self.results.list_backup()?);
        audit.unreferenced_files = on_disk
            .into_iter()
            .filter(|name| !referenced.contains(name))
            .collect();

        if !audit.is_clean() {
            tracing::warn!(
                missing = audit.missing_files.len(),
                restorable = audit.restorable.len(),
                unreferenced = audit.unreferenced_files.len(),
                "storage audit found inconsistencies"
            );
        }
        Ok(audit)
    }

    /// Delete stored files that no result references. Returns how many were removed.
    pub fn sweep_unreferenced_files(&self) -> ServiceResult<usize> {
        let audit = self.audit_storage()?;
        let mut removed = 0;
        for name in &audit.unreferenced_files {
            if self.results.remove(name)?.any() {
                removed += 1;
            }
        }
        tracing::info!(removed, "unreferenced files swept");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::service;
    use crate::models::{PatientInput, ResultSubmission, UploadedFile};
    use std::fs;

    #[test]
    fn test_audit_and_sweep() {
        let (_dir, service) = service();
        let ana = service.create_patient(&PatientInput::new("Ana", "1")).unwrap();
        let submit = |order: &str| {
            service
                .submit_result(ResultSubmission {
                    patient_id: ana.id,
                    order_number: Some(order.into()),
                    sample_date: None,
                    file: Some(UploadedFile::new("a.pdf", b"%PDF".to_vec())),
                })
                .unwrap()
        };
        let gone = submit("ORD-1");
        let restorable = submit("ORD-2");
        submit("ORD-3");

        service.results_store().remove(gone.file_name.as_deref().unwrap()).unwrap();
        let primary = service
            .results_store()
            .path_of(restorable.file_name.as_deref().unwrap())
            .unwrap();
        fs::remove_file(primary).unwrap();
        let stray = service.results_store().store("X", "suelto.pdf", b"stray").unwrap();

        let audit = service.audit_storage().unwrap();
        assert_eq!(audit.missing_files.len(), 1);
        assert_eq!(audit.missing_files[0].id, gone.id);
        assert_eq!(audit.restorable.len(), 1);
        assert_eq!(audit.unreferenced_files, vec![stray.name.clone()]);

        assert_eq!(service.sweep_unreferenced_files().unwrap(), 1);
        assert!(!service.results_store().exists(&stray.name));
        assert!(!service.results_store().backup_exists(&stray.name));
        assert!(service.audit_storage().unwrap().unreferenced_files.is_empty());
    }

    #[test]
    fn test_clean_store() {
        let (_dir, service) = service();
        assert!(service.audit_storage().unwrap().is_clean());
        assert_eq!(service.sweep_unreferenced_files().unwrap(), 0);
    }

    #[test]
    fn test_sweep_ignores_foreign_files_and_covers_backup() {
        let (_dir, service) = service();
        let store = service.results_store();
        fs::write(store.root().join(".DS_Store"), b"junk").unwrap();
        let stray = store.store("X", "stray.pdf", b"stray").unwrap();
        let backup_only = store.store("Y", "solo.pdf", b"solo").unwrap();
        fs::remove_file(store.path_of(&backup_only.name).unwrap()).unwrap();

        let audit = service.audit_storage().unwrap();
        let mut expected = vec![stray.name.clone(), backup_only.name.clone()];
        expected.sort();
        assert_eq!(audit.unreferenced_files, expected);

        assert_eq!(service.sweep_unreferenced_files().unwrap(), 2);
        assert!(!store.exists(&stray.name));
        assert!(!store.backup_exists(&backup_only.name));
        assert!(store.root().join(".DS_Store").is_file());
    }
}
