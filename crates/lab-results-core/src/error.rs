//! Service-level error type.

use thiserror::Error;

use crate::auth::PasswordError;
use crate::db::DbError;
use crate::export::ExportError;
use crate::storage::StorageError;

/// Errors returned by [`crate::LabService`].
#[derive(Error, Debug)]
pub enum LabError {
    /// Input rejected before anything was written
    #[error("Error de validación: {0}")]
    Validation(String),

    #[error("No encontrado: {0}")]
    NotFound(String),

    /// A unique field already holds this value
    #[error("Valor duplicado: {0}")]
    Duplicate(String),

    #[error("Error de almacenamiento: {0}")]
    Storage(String),

    #[error("Error de base de datos: {0}")]
    Persistence(String),

    /// A record references a stored file that no longer exists
    #[error("El archivo {0} no existe en el servidor")]
    FileMissing(String),

    #[error("Error al generar el documento: {0}")]
    Export(String),
}

impl LabError {
    pub fn is_validation(&self) -> bool {
        matches!(self, LabError::Validation(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, LabError::Duplicate(_))
    }
}

pub type ServiceResult<T> = Result<T, LabError>;

impl From<DbError> for LabError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => LabError::NotFound(what),
            DbError::Duplicate(column) => LabError::Duplicate(column),
            other => LabError::Persistence(other.to_string()),
        }
    }
}

impl From<StorageError> for LabError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::EmptyFile(name) => {
                LabError::Validation(format!("El archivo {} está vacío", name))
            }
            StorageError::InvalidName(name) => {
                LabError::Validation(format!("Nombre de archivo inválido: {}", name))
            }
            StorageError::NotFound(name) => LabError::FileMissing(name),
            other => LabError::Storage(other.to_string()),
        }
    }
}

impl From<ExportError> for LabError {
    fn from(e: ExportError) -> Self {
        LabError::Export(e.to_string())
    }
}

impl From<PasswordError> for LabError {
    fn from(e: PasswordError) -> Self {
        LabError::Persistence(e.to_string())
    }
}
