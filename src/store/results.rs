//! The flat `student_results` table kept from the single-table system.

use super::records::grade_counts;
use super::{StoreError, StoreResult};
use crate::grade::{Grade, Score};
use crate::legacy::ResultLine;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyResultRow {
    pub id: i64,
    pub index_number: String,
    pub full_name: String,
    pub course: String,
    pub score: i64,
    pub grade: Option<String>,
}

fn legacy_from_row(r: &Row<'_>) -> rusqlite::Result<LegacyResultRow> {
    Ok(LegacyResultRow {
        id: r.get(0)?,
        index_number: r.get(1)?,
        full_name: r.get(2)?,
        course: r.get(3)?,
        score: r.get(4)?,
        grade: r.get(5)?,
    })
}

pub fn insert_legacy_result(
    conn: &Connection,
    index_number: &str,
    full_name: &str,
    course: &str,
    score: Score,
) -> StoreResult<i64> {
    let index_number = index_number.trim();
    let full_name = full_name.trim();
    let course = course.trim();
    if index_number.is_empty() || full_name.is_empty() || course.is_empty() {
        return Err(StoreError::Invalid(
            "index number, full name and course are required".into(),
        ));
    }
    conn.execute(
        "INSERT INTO student_results(index_number, full_name, course, score, grade)
         VALUES(?, ?, ?, ?, ?)",
        (
            index_number,
            full_name,
            course,
            score.value(),
            score.grade().as_str(),
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyImport {
    pub inserted: usize,
    /// Index numbers skipped because they were already present, either in
    /// the table or earlier in the same file.
    pub duplicates: Vec<String>,
}

/// Inserts the lines in one transaction, skipping index numbers that already
/// exist.
pub fn import_legacy_lines(conn: &Connection, lines: &[ResultLine]) -> StoreResult<LegacyImport> {
    let tx = conn.unchecked_transaction()?;
    let mut out = LegacyImport::default();
    for line in lines {
        if legacy_exists(&tx, &line.index_number)? {
            out.duplicates.push(line.index_number.trim().to_string());
            continue;
        }
        insert_legacy_result(
            &tx,
            &line.index_number,
            &line.full_name,
            &line.course,
            line.score,
        )?;
        out.inserted += 1;
    }
    tx.commit()?;
    Ok(out)
}

pub fn list_legacy_results(conn: &Connection) -> StoreResult<Vec<LegacyResultRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, index_number, full_name, course, score, grade
         FROM student_results
         ORDER BY full_name, id",
    )?;
    let rows = stmt
        .query_map([], legacy_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn find_legacy_result(
    conn: &Connection,
    index_number: &str,
) -> StoreResult<Option<LegacyResultRow>> {
    Ok(conn
        .query_row(
            "SELECT id, index_number, full_name, course, score, grade
             FROM student_results
             WHERE index_number = ?
             ORDER BY id
             LIMIT 1",
            [index_number.trim()],
            legacy_from_row,
        )
        .optional()?)
}

pub fn legacy_exists(conn: &Connection, index_number: &str) -> StoreResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM student_results WHERE index_number = ?",
        [index_number.trim()],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

/// Sets a new score and re-derives the grade for every row with this index
/// number. Returns how many rows changed.
pub fn update_legacy_score(
    conn: &Connection,
    index_number: &str,
    score: Score,
) -> StoreResult<usize> {
    let n = conn.execute(
        "UPDATE student_results SET score = ?, grade = ? WHERE index_number = ?",
        (score.value(), score.grade().as_str(), index_number.trim()),
    )?;
    if n == 0 {
        return Err(StoreError::NotFound("result"));
    }
    Ok(n)
}

pub fn delete_legacy_result(conn: &Connection, index_number: &str) -> StoreResult<usize> {
    let n = conn.execute(
        "DELETE FROM student_results WHERE index_number = ?",
        [index_number.trim()],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound("result"));
    }
    Ok(n)
}

pub fn legacy_total(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM student_results", [], |r| r.get(0))?)
}

pub fn legacy_distribution(conn: &Connection) -> StoreResult<[(Grade, usize); 5]> {
    grade_counts(conn, "SELECT grade, COUNT(*) FROM student_results GROUP BY grade")
}

pub fn clear_legacy_results(conn: &Connection) -> StoreResult<usize> {
    Ok(conn.execute("DELETE FROM student_results", [])?)
}
