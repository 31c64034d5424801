//! Staff account database operations.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::StaffUser;

const USER_COLUMNS: &str = "id, username, password_hash, is_admin, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<StaffUser> {
    Ok(StaffUser {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        is_admin: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    /// Insert a staff account with an already-hashed password.
    pub fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> DbResult<StaffUser> {
        let created_at = Utc::now();
        self.conn
            .execute(
                r#"
                INSERT INTO staff_users (username, password_hash, is_admin, created_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![username, password_hash, is_admin, created_at],
            )
            .map_err(DbError::classify)?;

        Ok(StaffUser {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
            created_at,
        })
    }

    /// Get a staff account by username.
    pub fn get_user_by_username(&self, username: &str) -> DbResult<Option<StaffUser>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM staff_users WHERE username = ?", USER_COLUMNS),
                [username],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Replace the password hash and admin flag of an account.
    pub fn update_user_credentials(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE staff_users SET password_hash = ?2, is_admin = ?3 WHERE username = ?1",
            params![username, password_hash, is_admin],
        )?;
        Ok(rows_affected > 0)
    }

    /// List staff accounts by username.
    pub fn list_users(&self) -> DbResult<Vec<StaffUser>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM staff_users ORDER BY username",
            USER_COLUMNS
        ))?;
        let rows = stmt.query_map([], user_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
