//! Staff account operations.

use super::LabService;
use crate::auth::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::error::{LabError, ServiceResult};
use crate::models::StaffUser;

fn check_credentials(username: &str, password: &str) -> ServiceResult<()> {
    if username.is_empty() {
        return Err(LabError::Validation("El nombre de usuario es obligatorio".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LabError::Validation(format!(
            "La contraseña debe tener al menos {} caracteres",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Verify `password` against a fetched account. Needs no database access, so
/// callers can run it without holding the service.
pub fn check_password(user: StaffUser, password: &str) -> ServiceResult<Option<StaffUser>> {
    if verify_password(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        tracing::debug!(username = %user.username, "password rejected");
        Ok(None)
    }
}

impl LabService {
    /// Create a staff account.
    pub fn create_user(&self, username: &str, password: &str, is_admin: bool) -> ServiceResult<StaffUser> {
        let username = username.trim();
        check_credentials(username, password)?;

        let hash = hash_password(password)?;
        let user = self.db.insert_user(username, &hash, is_admin).map_err(|e| {
            if e.is_duplicate_of("staff_users.username") {
                LabError::Duplicate(format!("El usuario {} ya existe", username))
            } else {
                e.into()
            }
        })?;

        tracing::info!(username = %user.username, is_admin, "staff user created");
        Ok(user)
    }

    /// Check a username/password pair. Unknown users and wrong passwords both give `None`.
    pub fn authenticate(&self, username: &str, password: &str) -> ServiceResult<Option<StaffUser>> {
        match self.find_user(username)? {
            Some(user) => check_password(user, password),
            None => Ok(None),
        }
    }

    /// Look up an account without checking its password.
    pub fn find_user(&self, username: &str) -> ServiceResult<Option<StaffUser>> {
        Ok(self.db.get_user_by_username(username.trim())?)
    }

    /// Replace the password and admin flag of an existing account.
    pub fn set_password(&self, username: &str, password: &str, is_admin: bool) -> ServiceResult<()> {
        let username = username.trim();
        check_credentials(username, password)?;

        let hash = hash_password(password)?;
        if !self.db.update_user_credentials(username, &hash, is_admin)? {
            return Err(LabError::NotFound(format!("usuario {}", username)));
        }
        tracing::info!(username = %username, is_admin, "staff credentials updated");
        Ok(())
    }

    pub fn list_users(&self) -> ServiceResult<Vec<StaffUser>> {
        Ok(self.db.list_users()?)
    }
}
