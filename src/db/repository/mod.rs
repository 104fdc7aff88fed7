//! Document-table access for patients and clinician accounts.
//!
//! Records are stored whole as JSON documents keyed by id. Search is a full
//! scan with a substring filter; there is no index behind it.

mod patient;
mod user;

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::DatabaseError;
use crate::models::{Patient, User};

/// Hard cap on search results.
pub const MAX_SEARCH_RESULTS: usize = 20;

/// How the scan filter compares text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    /// Lower-case both sides before matching.
    Insensitive,
    Sensitive,
}

/// Substring filter for [`PatientStore::scan_patients`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    needle: String,
    case: CaseMode,
    limit: usize,
}

impl ScanFilter {
    /// `limit` is clamped to `1..=MAX_SEARCH_RESULTS`.
    pub fn new(query: &str, case: CaseMode, limit: usize) -> Self {
        let query = query.trim();
        let needle = match case {
            CaseMode::Insensitive => query.to_lowercase(),
            CaseMode::Sensitive => query.to_string(),
        };
        Self {
            needle,
            case,
            limit: limit.clamp(1, MAX_SEARCH_RESULTS),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn matches(&self, patient: &Patient) -> bool {
        patient.matches(&self.needle, self.case == CaseMode::Insensitive)
    }
}

/// Patient document table.
pub trait PatientStore: Send + Sync {
    fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, DatabaseError>;

    /// Insert, or overwrite the whole record if the id exists.
    fn put_patient(&self, patient: &Patient) -> Result<(), DatabaseError>;

    fn scan_patients(&self, filter: &ScanFilter) -> Result<Vec<Patient>, DatabaseError>;
}

/// Clinician account table.
pub trait UserStore: Send + Sync {
    fn get_user(&self, user_id: &str) -> Result<Option<User>, DatabaseError>;

    fn put_user(&self, user: &User) -> Result<(), DatabaseError>;
}

/// SQLite-backed implementation of both tables.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Fresh in-memory store with migrations applied.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(super::open_memory_database()?))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl PatientStore for SqliteStore {
    fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
        let conn = self.conn()?;
        patient::get_patient(&conn, patient_id)
    }

    fn put_patient(&self, patient: &Patient) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        patient::put_patient(&conn, patient)
    }

    fn scan_patients(&self, filter: &ScanFilter) -> Result<Vec<Patient>, DatabaseError> {
        let conn = self.conn()?;
        patient::scan_patients(&conn, filter)
    }
}

impl UserStore for SqliteStore {
    fn get_user(&self, user_id: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn()?;
        user::get_user(&conn, user_id)
    }

    fn put_user(&self, user: &User) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        user::put_user(&conn, user)
    }
}
