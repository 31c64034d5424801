//! Lab test catalog database operations.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{LabTest, LabTestInput};

const LAB_TEST_COLUMNS: &str = "id, name, category, description, price, image, created_at";

fn lab_test_from_row(row: &Row<'_>) -> rusqlite::Result<LabTest> {
    Ok(LabTest {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        image: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Database {
    /// Insert a catalog test.
    pub fn insert_lab_test(&self, input: &LabTestInput, image: Option<&str>) -> DbResult<LabTest> {
        let created_at = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO lab_tests (name, category, description, price, image, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                input.name,
                input.category,
                input.description,
                input.price,
                image,
                created_at,
            ],
        )?;

        Ok(LabTest {
            id: self.conn.last_insert_rowid(),
            name: input.name.clone(),
            category: input.category.clone(),
            description: input.description.clone(),
            price: input.price,
            image: image.map(str::to_string),
            created_at,
        })
    }

    /// Get a catalog test by ID.
    pub fn get_lab_test(&self, id: i64) -> DbResult<Option<LabTest>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM lab_tests WHERE id = ?", LAB_TEST_COLUMNS),
                [id],
                lab_test_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List the catalog ordered by category, then name. Uncategorized tests sort first.
    pub fn list_lab_tests(&self) -> DbResult<Vec<LabTest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lab_tests ORDER BY category, name",
            LAB_TEST_COLUMNS
        ))?;

        let rows = stmt.query_map([], lab_test_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Most recently added tests.
    pub fn recent_lab_tests(&self, limit: usize) -> DbResult<Vec<LabTest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lab_tests ORDER BY created_at DESC, id DESC LIMIT ?",
            LAB_TEST_COLUMNS
        ))?;

        let rows = stmt.query_map([limit as i64], lab_test_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Distinct non-empty categories in alphabetical order.
    pub fn list_categories(&self) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT category FROM lab_tests
            WHERE category IS NOT NULL AND category != ''
            ORDER BY category
            "#,
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Update the editable fields of a catalog test.
    pub fn update_lab_test(
        &self,
        id: i64,
        input: &LabTestInput,
        image: Option<&str>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE lab_tests SET
                name = ?2,
                category = ?3,
                description = ?4,
                price = ?5,
                image = ?6
            WHERE id = ?1
            "#,
            params![
                id,
                input.name,
                input.category,
                input.description,
                input.price,
                image,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a catalog test.
    pub fn delete_lab_test(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM lab_tests WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Count catalog tests.
    pub fn count_lab_tests(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM lab_tests", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
