//! Patient database operations.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::results::{result_from_row, RESULT_COLUMNS};
use super::{Database, DbError, DbResult};
use crate::models::{Patient, PatientInput, ResultRecord};

const PATIENT_COLUMNS: &str = "id, full_name, ci, phone, email, registered_at";

/// Escape LIKE wildcards so user input matches literally under `ESCAPE '\'`.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        ci: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        registered_at: row.get(5)?,
    })
}

impl Database {
    /// Insert a new patient. A taken CI is reported as `DbError::Duplicate("patients.ci")`.
    pub fn insert_patient(&self, input: &PatientInput) -> DbResult<Patient> {
        let registered_at = Utc::now();
        self.conn
            .execute(
                r#"
                INSERT INTO patients (full_name, ci, phone, email, registered_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    input.full_name,
                    input.ci,
                    input.phone,
                    input.email,
                    registered_at,
                ],
            )
            .map_err(DbError::classify)?;

        Ok(Patient {
            id: self.conn.last_insert_rowid(),
            full_name: input.full_name.clone(),
            ci: input.ci.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            registered_at,
        })
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by national ID.
    pub fn get_patient_by_ci(&self, ci: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE ci = ?", PATIENT_COLUMNS),
                [ci],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all patients, most recently registered first.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY registered_at DESC, id DESC",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search patients by name or CI prefix.
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", escape_like(query.trim()));
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM patients
            WHERE full_name LIKE ?1 ESCAPE '\' OR ci LIKE ?1 ESCAPE '\'
            ORDER BY full_name
            LIMIT ?2
            "#,
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Update a patient and refresh the name/CI snapshot on all of its results.
    ///
    /// Returns the number of results whose snapshot was refreshed.
    pub fn update_patient_with_results(&self, id: i64, input: &PatientInput) -> DbResult<usize> {
        let tx = self.conn.unchecked_transaction()?;

        let rows_affected = tx
            .execute(
                r#"
                UPDATE patients SET
                    full_name = ?2,
                    ci = ?3,
                    phone = ?4,
                    email = ?5
                WHERE id = ?1
                "#,
                params![id, input.full_name, input.ci, input.phone, input.email],
            )
            .map_err(DbError::classify)?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("patient {}", id)));
        }

        let refreshed = tx.execute(
            "UPDATE results SET patient_name = ?2, patient_ci = ?3 WHERE patient_id = ?1",
            params![id, input.full_name, input.ci],
        )?;

        tx.commit()?;
        Ok(refreshed)
    }

    /// Delete a patient together with its results in one transaction.
    ///
    /// Returns the removed results so their files can be cleaned up.
    pub fn delete_patient_cascade(&self, id: i64) -> DbResult<Vec<ResultRecord>> {
        let tx = self.conn.unchecked_transaction()?;

        let results = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM results WHERE patient_id = ? ORDER BY id",
                RESULT_COLUMNS
            ))?;
            let rows = stmt.query_map([id], result_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tx.execute("DELETE FROM results WHERE patient_id = ?", [id])?;
        let rows_affected = tx.execute("DELETE FROM patients WHERE id = ?", [id])?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("patient {}", id)));
        }

        tx.commit()?;
        Ok(results)
    }

    /// Count registered patients.
    pub fn count_patients(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewResultRecord;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_result(db: &Database, patient: &Patient, order: &str, code: &str) -> ResultRecord {
        db.insert_result(&NewResultRecord {
            order_number: order.into(),
            patient_id: Some(patient.id),
            patient_name: patient.full_name.clone(),
            patient_ci: patient.ci.clone(),
            sample_date: None,
            file_name: None,
            file_checksum: None,
            access_code: code.into(),
            created_at: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut input = PatientInput::new("Ana Quispe", "1234567");
        input.phone = Some("70000000".into());

        let patient = db.insert_patient(&input).unwrap();

        let retrieved = db.get_patient(patient.id).unwrap().unwrap();
        assert_eq!(retrieved.full_name, "Ana Quispe");
        assert_eq!(retrieved.ci, "1234567");
        assert_eq!(retrieved.phone, Some("70000000".into()));
        assert_eq!(retrieved.email, None);

        let by_ci = db.get_patient_by_ci("1234567").unwrap().unwrap();
        assert_eq!(by_ci.id, patient.id);
    }

    #[test]
    fn test_duplicate_ci_rejected() {
        let db = setup_db();

        let first = db.insert_patient(&PatientInput::new("Ana", "1234567")).unwrap();
        let err = db
            .insert_patient(&PatientInput::new("Otra Persona", "1234567"))
            .unwrap_err();
        assert!(err.is_duplicate_of("patients.ci"));

        let retrieved = db.get_patient(first.id).unwrap().unwrap();
        assert_eq!(retrieved.full_name, "Ana");
        assert_eq!(db.count_patients().unwrap(), 1);
    }

    #[test]
    fn test_search_patients() {
        let db = setup_db();

        db.insert_patient(&PatientInput::new("Mario Flores", "111")).unwrap();
        db.insert_patient(&PatientInput::new("Marina Rojas", "222")).unwrap();
        db.insert_patient(&PatientInput::new("Luis Mamani", "1119")).unwrap();

        let by_name = db.search_patients("Mari", 10).unwrap();
        assert_eq!(by_name.len(), 2);

        let by_ci = db.search_patients("111", 10).unwrap();
        assert_eq!(by_ci.len(), 2);
        assert!(by_ci.iter().any(|p| p.full_name == "Luis Mamani"));
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let db = setup_db();

        db.insert_patient(&PatientInput::new("Mario Flores", "111")).unwrap();
        db.insert_patient(&PatientInput::new("100% Real", "5_5")).unwrap();

        assert!(db.search_patients("%", 10).unwrap().is_empty());
        assert_eq!(db.search_patients("100%", 10).unwrap().len(), 1);
        assert!(db.search_patients("M_rio", 10).unwrap().is_empty());
        assert_eq!(db.search_patients("5_", 10).unwrap().len(), 1);
        assert!(db.search_patients("1_", 10).unwrap().is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
        assert_eq!(escape_like("Ana"), "Ana");
    }

    #[test]
    fn test_update_refreshes_result_snapshot() {
        let db = setup_db();

        let patient = db.insert_patient(&PatientInput::new("Ana", "123")).unwrap();
        add_result(&db, &patient, "ORD-1", "AAAA1111");
        add_result(&db, &patient, "ORD-2", "BBBB2222");

        let refreshed = db
            .update_patient_with_results(patient.id, &PatientInput::new("Ana María", "456"))
            .unwrap();
        assert_eq!(refreshed, 2);

        for result in db.list_results_for_patient(patient.id).unwrap() {
            assert_eq!(result.patient_name, "Ana María");
            assert_eq!(result.patient_ci, "456");
        }
    }

    #[test]
    fn test_update_to_taken_ci_changes_nothing() {
        let db = setup_db();

        let ana = db.insert_patient(&PatientInput::new("Ana", "123")).unwrap();
        db.insert_patient(&PatientInput::new("Luis", "456")).unwrap();
        add_result(&db, &ana, "ORD-1", "AAAA1111");

        let err = db
            .update_patient_with_results(ana.id, &PatientInput::new("Ana", "456"))
            .unwrap_err();
        assert!(err.is_duplicate_of("patients.ci"));

        assert_eq!(db.get_patient(ana.id).unwrap().unwrap().ci, "123");
        assert_eq!(db.list_results_for_patient(ana.id).unwrap()[0].patient_ci, "123");
    }

    #[test]
    fn test_update_missing_patient() {
        let db = setup_db();
        let err = db
            .update_patient_with_results(99, &PatientInput::new("Nadie", "0"))
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_delete_cascade_returns_results() {
        let db = setup_db();

        let ana = db.insert_patient(&PatientInput::new("Ana", "123")).unwrap();
        let luis = db.insert_patient(&PatientInput::new("Luis", "456")).unwrap();
        add_result(&db, &ana, "ORD-1", "AAAA1111");
        add_result(&db, &ana, "ORD-2", "BBBB2222");
        add_result(&db, &luis, "ORD-3", "CCCC3333");

        let removed = db.delete_patient_cascade(ana.id).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(db.get_patient(ana.id).unwrap().is_none());
        assert_eq!(db.count_results().unwrap(), 1);
    }
}
