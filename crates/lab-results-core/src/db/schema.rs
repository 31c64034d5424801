//! SQLite schema definition.

/// Complete database schema for the lab results store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    ci TEXT NOT NULL UNIQUE,
    phone TEXT,
    email TEXT,
    registered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(full_name);

-- ============================================================================
-- Results (patient name/CI are a snapshot, refreshed on patient edit)
-- ============================================================================

CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_number TEXT NOT NULL UNIQUE,
    patient_id INTEGER REFERENCES patients(id) ON DELETE CASCADE,
    patient_name TEXT NOT NULL,
    patient_ci TEXT NOT NULL,
    sample_date TEXT,
    file_name TEXT UNIQUE,                      -- one result per stored file
    file_checksum TEXT,                         -- SHA-256 hex of stored bytes
    access_code TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Public portal lookup is (CI, access code)
CREATE INDEX IF NOT EXISTS idx_results_lookup ON results(patient_ci, access_code);
CREATE INDEX IF NOT EXISTS idx_results_patient ON results(patient_id);
CREATE INDEX IF NOT EXISTS idx_results_created ON results(created_at);

-- ============================================================================
-- Lab Test Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS lab_tests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT,
    description TEXT,
    price REAL NOT NULL DEFAULT 0.0 CHECK (price >= 0.0),
    image TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lab_tests_category ON lab_tests(category, name);

-- ============================================================================
-- Staff Accounts
-- ============================================================================

CREATE TABLE IF NOT EXISTS staff_users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_ci_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO patients (full_name, ci, registered_at) VALUES ('Ana', '123', '2024-01-01')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO patients (full_name, ci, registered_at) VALUES ('Otra', '123', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_results_cascade_with_patient() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO patients (full_name, ci, registered_at) VALUES ('Ana', '123', '2024-01-01')",
            [],
        )
        .unwrap();
        conn.execute(
            r#"INSERT INTO results (order_number, patient_id, patient_name, patient_ci, access_code, created_at)
               VALUES ('ORD-1', 1, 'Ana', '123', 'ABCD1234', '2024-01-01')"#,
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM patients WHERE id = 1", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_negative_price_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO lab_tests (name, price, created_at) VALUES ('UREA', -5.0, '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
