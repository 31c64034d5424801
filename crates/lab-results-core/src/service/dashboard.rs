//! Back-office dashboard figures.

use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::LabService;
use crate::error::{LabError, ServiceResult};
use crate::models::LabTest;

/// Short Spanish month names, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Months covered by the series, current month included.
const SERIES_MONTHS: u32 = 6;

const RECENT_TESTS: usize = 5;

/// Registrations and samples in one calendar month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyCount {
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub patients: u64,
    pub results: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub total_patients: u64,
    pub total_results: u64,
    pub total_tests: u64,
    pub patients_this_month: u64,
    pub results_this_month: u64,
    /// Oldest month first
    pub monthly: Vec<MonthlyCount>,
    pub recent_tests: Vec<LabTest>,
}

/// `(year, month)` pairs of the `count` months ending at `today`'s month, oldest first.
fn trailing_months(today: NaiveDate, count: u32) -> Vec<(i32, u32)> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .collect()
}

impl LabService {
    pub fn dashboard(&self) -> ServiceResult<DashboardStats> {
        self.dashboard_at(Utc::now().date_naive())
    }

    /// Dashboard figures as seen on `today`.
    pub fn dashboard_at(&self, today: NaiveDate) -> ServiceResult<DashboardStats> {
        let months = trailing_months(today, SERIES_MONTHS);
        let (first_year, first_month) = months[0];
        let since = NaiveDate::from_ymd_opt(first_year, first_month, 1)
            .ok_or_else(|| LabError::Validation(format!("fecha inválida: {}", today)))?;
        let since_utc = Utc.from_utc_datetime(&since.and_time(chrono::NaiveTime::MIN));

        let registrations = self.db.patient_registrations_since(since_utc)?;
        let samples = self.db.result_sample_dates_since(since)?;

        let monthly: Vec<MonthlyCount> = months
            .iter()
            .map(|&(year, month)| MonthlyCount {
                label: MONTH_LABELS[(month - 1) as usize].to_string(),
                year,
                month,
                patients: registrations
                    .iter()
                    .filter(|at| at.year() == year && at.month() == month)
                    .count() as u64,
                results: samples
                    .iter()
                    .filter(|d| d.year() == year && d.month() == month)
                    .count() as u64,
            })
            .collect();

        let (patients_this_month, results_this_month) = monthly
            .last()
            .map(|m| (m.patients, m.results))
            .unwrap_or_default();

        Ok(DashboardStats {
            total_patients: self.db.count_patients()?,
            total_results: self.db.count_results()?,
            total_tests: self.db.count_lab_tests()?,
            patients_this_month,
            results_this_month,
            monthly,
            recent_tests: self.db.recent_lab_tests(RECENT_TESTS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::service;
    use super::*;
    use crate::models::{LabTestInput, PatientInput, ResultSubmission, UploadedFile};

    #[test]
    fn test_trailing_months_wraps_year() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        assert_eq!(
            trailing_months(today, 6),
            vec![(2023, 9), (2023, 10), (2023, 11), (2023, 12), (2024, 1), (2024, 2)]
        );
    }

    #[test]
    fn test_dashboard_counts() {
        let (_dir, service) = service();
        let ana = service.create_patient(&PatientInput::new("Ana", "1")).unwrap();
        service.create_patient(&PatientInput::new("Luis", "2")).unwrap();
        for name in ["A", "B", "C", "D", "E", "F"] {
            service.create_lab_test(&LabTestInput::new(name, 10.0), None).unwrap();
        }

        let today = Utc::now().date_naive();
        service
            .submit_result(ResultSubmission {
                patient_id: ana.id,
                order_number: None,
                sample_date: Some(today),
                file: Some(UploadedFile::new("a.pdf", b"%PDF".to_vec())),
            })
            .unwrap();

        let stats = service.dashboard_at(today).unwrap();
        assert_eq!(stats.total_patients, 2);
        assert_eq!(stats.total_results, 1);
        assert_eq!(stats.total_tests, 6);
        assert_eq!(stats.patients_this_month, 2);
        assert_eq!(stats.results_this_month, 1);
        assert_eq!(stats.monthly.len(), 6);
        assert_eq!(
            stats.monthly.last().unwrap().label,
            MONTH_LABELS[today.month0() as usize]
        );
        assert_eq!(stats.recent_tests.len(), 5);
        assert_eq!(stats.recent_tests[0].name, "F");
    }
}
