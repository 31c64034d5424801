//! Database layer for the lab results store.

mod schema;
mod catalog;
mod patients;
mod results;
mod stats;
mod users;

pub use schema::*;
#[allow(unused_imports)]
pub use catalog::*;
#[allow(unused_imports)]
pub use patients::*;
#[allow(unused_imports)]
pub use results::*;
#[allow(unused_imports)]
pub use stats::*;
#[allow(unused_imports)]
pub use users::*;

use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// UNIQUE constraint rejection; holds `table.column`
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DbError {
    /// Classify a SQLite error, pulling constraint violations out of the generic variant.
    pub(crate) fn classify(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, Some(ref msg)) = err {
            if failure.code == ErrorCode::ConstraintViolation {
                if let Some(column) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    return DbError::Duplicate(column.to_string());
                }
                return DbError::Constraint(msg.clone());
            }
        }
        DbError::Sqlite(err)
    }

    /// Whether this is a UNIQUE rejection on the given `table.column`.
    pub fn is_duplicate_of(&self, column: &str) -> bool {
        matches!(self, DbError::Duplicate(c) if c == column)
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        // Check that tables exist
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"patients".to_string()));
        assert!(tables.contains(&"results".to_string()));
        assert!(tables.contains(&"lab_tests".to_string()));
        assert!(tables.contains(&"staff_users".to_string()));
    }

    #[test]
    fn test_classify_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO staff_users (username, password_hash, created_at) VALUES ('a', 'x', '2024-01-01')",
                [],
            )
            .unwrap();
        let err = db
            .conn()
            .execute(
                "INSERT INTO staff_users (username, password_hash, created_at) VALUES ('a', 'y', '2024-01-01')",
                [],
            )
            .unwrap_err();

        let classified = DbError::classify(err);
        assert!(classified.is_duplicate_of("staff_users.username"));
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.sqlite3");

        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO patients (full_name, ci, registered_at) VALUES ('Ana', '1', '2024-01-01')",
                    [],
                )
                .unwrap();
        }

        let reopened = Database::open(&path).unwrap();
        let count: i64 = reopened
            .conn()
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
