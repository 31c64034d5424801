//! Raw queries behind the dashboard figures.

use chrono::{DateTime, NaiveDate, Utc};

use super::{Database, DbResult};

impl Database {
    /// Registration timestamps of patients registered at or after `since`.
    pub fn patient_registrations_since(&self, since: DateTime<Utc>) -> DbResult<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare(
            "SELECT registered_at FROM patients WHERE registered_at >= ? ORDER BY registered_at",
        )?;
        let rows = stmt.query_map([since], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Sample dates of results sampled on or after `since`.
    pub fn result_sample_dates_since(&self, since: NaiveDate) -> DbResult<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT sample_date FROM results
            WHERE sample_date IS NOT NULL AND sample_date >= ?
            ORDER BY sample_date
            "#,
        )?;
        let rows = stmt.query_map([since], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewResultRecord, PatientInput};
    use chrono::Duration;

    #[test]
    fn test_registrations_since() {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&PatientInput::new("Ana", "1")).unwrap();
        db.insert_patient(&PatientInput::new("Luis", "2")).unwrap();

        let recent = db
            .patient_registrations_since(Utc::now() - Duration::days(1))
            .unwrap();
        assert_eq!(recent.len(), 2);

        let future = db
            .patient_registrations_since(Utc::now() + Duration::days(1))
            .unwrap();
        assert!(future.is_empty());
    }

    #[test]
    fn test_sample_dates_since() {
        let db = Database::open_in_memory().unwrap();
        for (i, date) in [(1, "2024-01-10"), (2, "2024-03-02"), (3, "2024-05-20")] {
            db.insert_result(&NewResultRecord {
                order_number: format!("ORD-{}", i),
                patient_id: None,
                patient_name: "Ana".into(),
                patient_ci: "1".into(),
                sample_date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
                file_name: None,
                file_checksum: None,
                access_code: format!("CODE000{}", i),
                created_at: Utc::now(),
            })
            .unwrap();
        }

        let since_march = db
            .result_sample_dates_since(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .unwrap();
        assert_eq!(since_march.len(), 2);
        assert_eq!(since_march[0], NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }
}
