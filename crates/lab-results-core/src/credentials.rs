//! Order number and access code issuance.
//!
//! Issued values are checked against the results table before they are handed
//! out. The check and the later insert are not atomic, so callers still have
//! to handle a UNIQUE rejection on insert (see `LabService::submit_result`).

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::db::{Database, DbError, DbResult};

/// Length of a public access code.
pub const ACCESS_CODE_LEN: usize = 8;

/// Alphabet access codes are drawn from.
pub const ACCESS_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Upper bound on candidates tried before issuance gives up.
pub const MAX_ISSUE_ATTEMPTS: usize = 20;

/// Base order number for a timestamp, without disambiguation.
pub fn order_number_for(at: DateTime<Utc>) -> String {
    format!("ORD-{}", at.format("%Y%m%d-%H%M%S"))
}

/// Draw one access code from `rng`.
pub fn random_access_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ACCESS_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ACCESS_CODE_CHARSET.len());
            ACCESS_CODE_CHARSET[idx] as char
        })
        .collect()
}

/// Whether `code` has the shape of an issued access code.
pub fn is_well_formed_access_code(code: &str) -> bool {
    code.len() == ACCESS_CODE_LEN && code.bytes().all(|b| ACCESS_CODE_CHARSET.contains(&b))
}

/// Where a new result gets its order number and access code.
pub trait CredentialSource {
    fn order_number(&self) -> DbResult<String>;
    fn access_code(&self) -> DbResult<String>;
}

/// Issues order numbers and access codes unique against the results table.
pub struct CredentialIssuer<'a> {
    db: &'a Database,
}

impl<'a> CredentialIssuer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Issue an order number for the current time.
    pub fn generate_order_number(&self) -> DbResult<String> {
        self.generate_order_number_at(Utc::now())
    }

    /// Issue an order number for `at`.
    ///
    /// The base form is `ORD-YYYYMMDD-HHMMSS`; when taken, `-2`, `-3`, ... are
    /// appended until a free value is found.
    pub fn generate_order_number_at(&self, at: DateTime<Utc>) -> DbResult<String> {
        let base = order_number_for(at);
        if !self.db.order_number_exists(&base)? {
            return Ok(base);
        }

        for n in 2..=MAX_ISSUE_ATTEMPTS {
            let candidate = format!("{}-{}", base, n);
            if !self.db.order_number_exists(&candidate)? {
                tracing::debug!(order_number = %candidate, "order number disambiguated");
                return Ok(candidate);
            }
        }

        Err(DbError::Duplicate("results.order_number".into()))
    }

    /// Issue a fresh access code.
    pub fn generate_access_code(&self) -> DbResult<String> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let code = random_access_code(&mut rng);
            if !self.db.access_code_exists(&code)? {
                return Ok(code);
            }
        }

        Err(DbError::Duplicate("results.access_code".into()))
    }
}

impl CredentialSource for CredentialIssuer<'_> {
    fn order_number(&self) -> DbResult<String> {
        self.generate_order_number()
    }

    fn access_code(&self) -> DbResult<String> {
        self.generate_access_code()
    }
}
