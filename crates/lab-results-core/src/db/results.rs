//! Result record database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{NewResultRecord, ResultRecord};

pub(crate) const RESULT_COLUMNS: &str = "id, order_number, patient_id, patient_name, patient_ci, \
     sample_date, file_name, file_checksum, access_code, created_at";

pub(crate) fn result_from_row(row: &Row<'_>) -> rusqlite::Result<ResultRecord> {
    Ok(ResultRecord {
        id: row.get(0)?,
        order_number: row.get(1)?,
        patient_id: row.get(2)?,
        patient_name: row.get(3)?,
        patient_ci: row.get(4)?,
        sample_date: row.get(5)?,
        file_name: row.get(6)?,
        file_checksum: row.get(7)?,
        access_code: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl Database {
    /// Insert a new result.
    ///
    /// UNIQUE rejections come back as `DbError::Duplicate` naming the column
    /// (`results.order_number`, `results.access_code`, `results.file_name`).
    pub fn insert_result(&self, record: &NewResultRecord) -> DbResult<ResultRecord> {
        self.conn
            .execute(
                r#"
                INSERT INTO results (
                    order_number, patient_id, patient_name, patient_ci, sample_date,
                    file_name, file_checksum, access_code, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    record.order_number,
                    record.patient_id,
                    record.patient_name,
                    record.patient_ci,
                    record.sample_date,
                    record.file_name,
                    record.file_checksum,
                    record.access_code,
                    record.created_at,
                ],
            )
            .map_err(DbError::classify)?;

        Ok(record.clone().into_record(self.conn.last_insert_rowid()))
    }

    /// Get a result by ID.
    pub fn get_result(&self, id: i64) -> DbResult<Option<ResultRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM results WHERE id = ?", RESULT_COLUMNS),
                [id],
                result_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a result by order number.
    pub fn get_result_by_order_number(&self, order_number: &str) -> DbResult<Option<ResultRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM results WHERE order_number = ?", RESULT_COLUMNS),
                [order_number],
                result_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Public portal lookup: exact match on both CI and access code.
    pub fn find_result_by_credentials(
        &self,
        ci: &str,
        access_code: &str,
    ) -> DbResult<Option<ResultRecord>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM results WHERE patient_ci = ?1 AND access_code = ?2",
                    RESULT_COLUMNS
                ),
                params![ci, access_code],
                result_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List all results, newest first.
    pub fn list_results(&self) -> DbResult<Vec<ResultRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM results ORDER BY created_at DESC, id DESC",
            RESULT_COLUMNS
        ))?;

        let rows = stmt.query_map([], result_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List the results owned by a patient, newest first.
    pub fn list_results_for_patient(&self, patient_id: i64) -> DbResult<Vec<ResultRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM results WHERE patient_id = ? ORDER BY created_at DESC, id DESC",
            RESULT_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], result_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Point a result at a different stored file.
    pub fn update_result_file(
        &self,
        id: i64,
        file_name: &str,
        file_checksum: &str,
    ) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                "UPDATE results SET file_name = ?2, file_checksum = ?3 WHERE id = ?1",
                params![id, file_name, file_checksum],
            )
            .map_err(DbError::classify)?;
        Ok(rows_affected > 0)
    }

    /// Delete a result.
    pub fn delete_result(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM results WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Check whether an order number is taken.
    pub fn order_number_exists(&self, order_number: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM results WHERE order_number = ?)",
            [order_number],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Check whether an access code is taken.
    pub fn access_code_exists(&self, access_code: &str) -> DbResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM results WHERE access_code = ?)",
            [access_code],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// All stored file names referenced by some result.
    pub fn referenced_file_names(&self) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_name FROM results WHERE file_name IS NOT NULL ORDER BY file_name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Count issued results.
    pub fn count_results(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_record(order: &str, ci: &str, code: &str) -> NewResultRecord {
        NewResultRecord {
            order_number: order.into(),
            patient_id: None,
            patient_name: "Ana Quispe".into(),
            patient_ci: ci.into(),
            sample_date: NaiveDate::from_ymd_opt(2024, 3, 5),
            file_name: Some(format!("{}_informe.pdf", order)),
            file_checksum: Some("abc123".into()),
            access_code: code.into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 6, 14, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let inserted = db.insert_result(&make_record("ORD-1", "1234567", "AB3D9F2K")).unwrap();
        let retrieved = db.get_result(inserted.id).unwrap().unwrap();

        assert_eq!(retrieved, inserted);
        assert_eq!(retrieved.sample_date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(
            retrieved.created_at,
            Utc.with_ymd_and_hms(2024, 3, 6, 14, 30, 0).unwrap()
        );

        let by_order = db.get_result_by_order_number("ORD-1").unwrap().unwrap();
        assert_eq!(by_order.id, inserted.id);
    }

    #[test]
    fn test_find_by_credentials() {
        let db = setup_db();
        db.insert_result(&make_record("ORD-1", "1234567", "AB3D9F2K")).unwrap();

        assert!(db
            .find_result_by_credentials("1234567", "AB3D9F2K")
            .unwrap()
            .is_some());
        assert!(db
            .find_result_by_credentials("1234567", "AB3D9F2X")
            .unwrap()
            .is_none());
        assert!(db
            .find_result_by_credentials("7654321", "AB3D9F2K")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unique_columns_reported() {
        let db = setup_db();
        db.insert_result(&make_record("ORD-1", "1", "CODE0001")).unwrap();

        let mut same_order = make_record("ORD-1", "1", "CODE0002");
        same_order.file_name = Some("distinto.pdf".into());
        let err = db.insert_result(&same_order).unwrap_err();
        assert!(err.is_duplicate_of("results.order_number"));

        let mut same_code = make_record("ORD-2", "1", "CODE0001");
        same_code.file_name = Some("other.pdf".into());
        let err = db.insert_result(&same_code).unwrap_err();
        assert!(err.is_duplicate_of("results.access_code"));

        assert_eq!(db.count_results().unwrap(), 1);
    }

    #[test]
    fn test_existence_checks() {
        let db = setup_db();
        db.insert_result(&make_record("ORD-1", "1", "CODE0001")).unwrap();

        assert!(db.order_number_exists("ORD-1").unwrap());
        assert!(!db.order_number_exists("ORD-2").unwrap());
        assert!(db.access_code_exists("CODE0001").unwrap());
        assert!(!db.access_code_exists("CODE0002").unwrap());
    }

    #[test]
    fn test_update_file_and_delete() {
        let db = setup_db();
        let record = db.insert_result(&make_record("ORD-1", "1", "CODE0001")).unwrap();

        assert!(db.update_result_file(record.id, "nuevo.pdf", "def456").unwrap());
        let updated = db.get_result(record.id).unwrap().unwrap();
        assert_eq!(updated.file_name, Some("nuevo.pdf".into()));
        assert_eq!(updated.file_checksum, Some("def456".into()));
        assert_eq!(updated.access_code, record.access_code);

        assert_eq!(db.referenced_file_names().unwrap(), vec!["nuevo.pdf".to_string()]);

        assert!(db.delete_result(record.id).unwrap());
        assert!(!db.delete_result(record.id).unwrap());
        assert!(db.get_result(record.id).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let db = setup_db();

        let mut older = make_record("ORD-1", "1", "CODE0001");
        older.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        db.insert_result(&older).unwrap();
        db.insert_result(&make_record("ORD-2", "1", "CODE0002")).unwrap();

        let listed = db.list_results().unwrap();
        assert_eq!(listed[0].order_number, "ORD-2");
        assert_eq!(listed[1].order_number, "ORD-1");
    }
}
