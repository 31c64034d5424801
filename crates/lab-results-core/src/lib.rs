//! Lab Results Core Library
//!
//! Patient registry, result issuance and public result lookup for a clinical
//! laboratory.
//!
//! # Architecture
//!
//! ```text
//!   Staff upload (patient, PDF, order number?)
//!                    │
//!               Validate ──── reject: nothing written
//!                    │
//!          Store file (+ backup copy)
//!                    │
//!      Issue order number / access code
//!                    │
//!            Persist result row ──── fail: stored file removed
//!                    │
//!       ┌────────────┼──────────────────┐
//!       ▼            ▼                  ▼
//!  Credentials   Public portal     Staff download
//!  (PDF / RTF)   (CI + code)       (backup restore)
//! ```
//!
//! # Core Principle
//!
//! **No partial state.** A failed operation leaves neither an orphaned file nor
//! a half-written row behind.
//!
//! # Modules
//!
//! - [`db`]: SQLite store for patients, results, the test catalog and staff accounts
//! - [`models`]: Domain types (Patient, ResultRecord, LabTest, StaffUser)
//! - [`storage`]: File store with backup copies
//! - [`credentials`]: Order number and access code issuance
//! - [`service`]: Result lifecycle orchestration
//! - [`export`]: Credential documents (PDF, RTF)
//! - [`auth`]: Staff password hashing

pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::{LabProfile, ServiceConfig};
pub use credentials::CredentialIssuer;
pub use db::{Database, DbError};
pub use error::{LabError, ServiceResult};
pub use export::{render_credentials, CredentialSheet, DocumentFormat, RenderedDocument};
pub use models::{
    LabTest, LabTestInput, Patient, PatientDeletion, PatientInput, ResultDownload, ResultRecord,
    ResultSubmission, Role, StaffUser, UploadedFile,
};
pub use service::{check_password, DashboardStats, LabService, MonthlyCount, StorageAudit};
pub use storage::{FileStore, StorageError};
