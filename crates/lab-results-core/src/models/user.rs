//! Staff account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A back-office account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffUser {
    pub id: i64,
    pub username: String,
    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl StaffUser {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::Staff
        }
    }
}

/// Access level of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous visitor: catalog and result lookup only
    Public,
    /// Authenticated staff: full CRUD and downloads
    Staff,
    /// Staff with administrative rights (orphan cleanup, storage maintenance)
    Admin,
}

impl Role {
    pub fn allows(self, required: Role) -> bool {
        self >= required
    }
}
