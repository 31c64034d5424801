//! Lab test catalog operations.

use std::collections::BTreeMap;

use super::LabService;
use crate::error::{LabError, ServiceResult};
use crate::models::{group_by_category, LabTest, LabTestInput, UploadedFile, IMAGE_EXTENSIONS};
use crate::storage::StoredFile;

fn check_image(image: &UploadedFile) -> ServiceResult<()> {
    match image.extension() {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(LabError::Validation(format!(
            "Formato de imagen no permitido: {} (use {})",
            image.file_name,
            IMAGE_EXTENSIONS.join(", ")
        ))),
    }
}

impl LabService {
    fn store_image(&self, image: Option<&UploadedFile>) -> ServiceResult<Option<StoredFile>> {
        match image {
            Some(image) => Ok(Some(self.images.store("", &image.file_name, &image.bytes)?)),
            None => Ok(None),
        }
    }

    /// Add a test to the catalog, optionally with a picture.
    pub fn create_lab_test(
        &self,
        input: &LabTestInput,
        image: Option<UploadedFile>,
    ) -> ServiceResult<LabTest> {
        let input = input.normalized();
        input.validate().map_err(LabError::Validation)?;
        if let Some(image) = &image {
            check_image(image)?;
        }

        let stored = self.store_image(image.as_ref())?;
        let image_name = stored.as_ref().map(|s| s.name.as_str());

        match self.db.insert_lab_test(&input, image_name) {
            Ok(test) => {
                tracing::info!(test_id = test.id, name = %test.name, "lab test created");
                Ok(test)
            }
            Err(e) => {
                if let Some(name) = image_name {
                    Self::discard_stored(&self.images, name);
                }
                Err(e.into())
            }
        }
    }

    pub fn get_lab_test(&self, id: i64) -> ServiceResult<LabTest> {
        self.db
            .get_lab_test(id)?
            .ok_or_else(|| LabError::NotFound(format!("prueba {}", id)))
    }

    /// Edit a test. A new picture replaces the old one, which is deleted afterwards.
    pub fn update_lab_test(
        &self,
        id: i64,
        input: &LabTestInput,
        image: Option<UploadedFile>,
    ) -> ServiceResult<LabTest> {
        let input = input.normalized();
        input.validate().map_err(LabError::Validation)?;
        if let Some(image) = &image {
            check_image(image)?;
        }
        let current = self.get_lab_test(id)?;

        let stored = self.store_image(image.as_ref())?;
        let image_name = match &stored {
            Some(s) => Some(s.name.as_str()),
            None => current.image.as_deref(),
        };

        let updated = match self.db.update_lab_test(id, &input, image_name) {
            Ok(true) => Ok(()),
            Ok(false) => Err(LabError::NotFound(format!("prueba {}", id))),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = updated {
            if let Some(s) = &stored {
                Self::discard_stored(&self.images, &s.name);
            }
            return Err(e);
        }

        if stored.is_some() {
            if let Some(old) = current.image.as_deref() {
                Self::remove_unreferenced(&self.images, old);
            }
        }

        tracing::info!(test_id = id, "lab test updated");
        self.get_lab_test(id)
    }

    /// Delete a test and its picture.
    pub fn delete_lab_test(&self, id: i64) -> ServiceResult<LabTest> {
        let test = self.get_lab_test(id)?;
        if !self.db.delete_lab_test(id)? {
            return Err(LabError::NotFound(format!("prueba {}", id)));
        }
        if let Some(image) = test.image.as_deref() {
            Self::remove_unreferenced(&self.images, image);
        }
        tracing::info!(test_id = id, "lab test deleted");
        Ok(test)
    }

    /// All tests ordered by category, then name.
    pub fn list_lab_tests(&self) -> ServiceResult<Vec<LabTest>> {
        Ok(self.db.list_lab_tests()?)
    }

    /// Public catalog: tests grouped by category, `General` for uncategorized ones.
    pub fn catalog_by_category(&self) -> ServiceResult<BTreeMap<String, Vec<LabTest>>> {
        Ok(group_by_category(self.db.list_lab_tests()?))
    }

    pub fn list_categories(&self) -> ServiceResult<Vec<String>> {
        Ok(self.db.list_categories()?)
    }

    /// Bytes of a catalog picture.
    pub fn read_catalog_image(&self, name: &str) -> ServiceResult<Vec<u8>> {
        self.images.read(name).map_err(|e| match LabError::from(e) {
            LabError::FileMissing(name) | LabError::Validation(name) => {
                LabError::NotFound(format!("imagen {}", name))
            }
            other => other,
        })
    }
}
