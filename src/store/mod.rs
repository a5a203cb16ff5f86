//! Record-keeping operations over an explicitly passed connection.
//!
//! Every front-end goes through these functions; handlers only translate
//! request params in and rows out.

mod courses;
mod people;
mod records;
mod results;

pub use courses::*;
pub use people::*;
pub use records::*;
pub use results::*;

use rusqlite::ErrorCode;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Turns a UNIQUE/CHECK violation into `Conflict`, leaving other errors alone.
pub(crate) fn conflict_on_constraint(e: rusqlite::Error, message: &str) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Db(e),
    }
}

/// Trimmed, with empty strings collapsed to `None`.
pub(crate) fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// An academic year plus semester, e.g. `2024-2025` / `First Semester`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub academic_year: String,
    pub semester: String,
}

impl Term {
    pub fn new(academic_year: &str, semester: &str) -> StoreResult<Self> {
        let academic_year = academic_year.trim();
        let semester = semester.trim();
        if academic_year.is_empty() || semester.is_empty() {
            return Err(StoreError::Invalid(
                "academic year and semester are required".into(),
            ));
        }
        Ok(Self {
            academic_year: academic_year.to_string(),
            semester: semester.to_string(),
        })
    }
}
