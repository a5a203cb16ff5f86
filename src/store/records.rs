use super::{
    count_courses, count_enrollments, count_people, get_course, is_enrolled, PersonKind,
    StoreError, StoreResult, Term,
};
use crate::grade::{self, CreditedRecord, Grade, Score};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicRecordRow {
    pub id: i64,
    pub student_id: String,
    pub student_name: String,
    pub course_code: String,
    pub course_name: String,
    pub staff_name: Option<String>,
    pub academic_year: String,
    pub semester: String,
    pub score: i64,
    pub grade: String,
    pub gpa_points: f64,
    pub credits: i64,
    pub recorded_at: String,
}

impl AcademicRecordRow {
    pub fn credited(&self) -> CreditedRecord {
        CreditedRecord::new(self.gpa_points, self.credits)
    }
}

const RECORD_SELECT: &str = "SELECT ar.id, s.student_id, s.full_name, c.course_code, c.course_name,
        st.full_name, ar.academic_year, ar.semester, ar.score, ar.grade, ar.gpa_points,
        ar.credits, ar.recorded_at
     FROM academic_records ar
     JOIN students s ON s.id = ar.student_id
     JOIN courses c ON c.id = ar.course_id
     LEFT JOIN staff st ON st.id = ar.staff_id";

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<AcademicRecordRow> {
    Ok(AcademicRecordRow {
        id: r.get(0)?,
        student_id: r.get(1)?,
        student_name: r.get(2)?,
        course_code: r.get(3)?,
        course_name: r.get(4)?,
        staff_name: r.get(5)?,
        academic_year: r.get(6)?,
        semester: r.get(7)?,
        score: r.get(8)?,
        grade: r.get(9)?,
        gpa_points: r.get(10)?,
        credits: r.get(11)?,
        recorded_at: r.get(12)?,
    })
}

#[derive(Debug, Clone)]
pub struct RecordScore {
    pub student_pk: i64,
    pub course_pk: i64,
    pub staff_pk: Option<i64>,
    pub term: Term,
    pub score: Score,
}

/// Stores a score with its derived grade, GPA points and the course's
/// credits. Re-recording the same student/course/term replaces the values.
pub fn record_score(conn: &Connection, rec: &RecordScore) -> StoreResult<AcademicRecordRow> {
    if !is_enrolled(conn, rec.student_pk, rec.course_pk, &rec.term)? {
        return Err(StoreError::Conflict(
            "student is not enrolled in this course for that term".into(),
        ));
    }
    let course = get_course(conn, rec.course_pk)?;
    let grade = rec.score.grade();
    let gpa_points = rec.score.gpa_points();

    conn.execute(
        "INSERT INTO academic_records(
            student_id, course_id, staff_id, academic_year, semester,
            score, grade, gpa_points, credits)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, course_id, academic_year, semester) DO UPDATE SET
            staff_id = excluded.staff_id,
            score = excluded.score,
            grade = excluded.grade,
            gpa_points = excluded.gpa_points,
            credits = excluded.credits,
            recorded_at = CURRENT_TIMESTAMP",
        (
            rec.student_pk,
            rec.course_pk,
            rec.staff_pk,
            &rec.term.academic_year,
            &rec.term.semester,
            rec.score.value(),
            grade.as_str(),
            gpa_points,
            course.credits,
        ),
    )?;
    tracing::info!(
        student_pk = rec.student_pk,
        course = %course.course_code,
        score = rec.score.value(),
        grade = %grade,
        "score recorded"
    );

    let mut found = query_records(
        conn,
        "ar.student_id = ? AND ar.course_id = ? AND ar.academic_year = ? AND ar.semester = ?",
        vec![
            Value::Integer(rec.student_pk),
            Value::Integer(rec.course_pk),
            Value::Text(rec.term.academic_year.clone()),
            Value::Text(rec.term.semester.clone()),
        ],
    )?;
    found.pop().ok_or(StoreError::NotFound("academic record"))
}

fn query_records(
    conn: &Connection,
    filter: &str,
    params: Vec<Value>,
) -> StoreResult<Vec<AcademicRecordRow>> {
    let sql = format!(
        "{RECORD_SELECT} WHERE {filter} ORDER BY ar.academic_year, ar.semester, c.course_code, s.full_name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A student's records, optionally narrowed to one academic year and/or
/// semester.
pub fn student_records(
    conn: &Connection,
    student_pk: i64,
    academic_year: Option<&str>,
    semester: Option<&str>,
) -> StoreResult<Vec<AcademicRecordRow>> {
    let mut filter = String::from("ar.student_id = ?");
    let mut params = vec![Value::Integer(student_pk)];
    if let Some(y) = academic_year {
        filter.push_str(" AND ar.academic_year = ?");
        params.push(Value::Text(y.to_string()));
    }
    if let Some(s) = semester {
        filter.push_str(" AND ar.semester = ?");
        params.push(Value::Text(s.to_string()));
    }
    query_records(conn, &filter, params)
}

pub fn course_grades(
    conn: &Connection,
    course_pk: i64,
    term: &Term,
) -> StoreResult<Vec<AcademicRecordRow>> {
    query_records(
        conn,
        "ar.course_id = ? AND ar.academic_year = ? AND ar.semester = ?",
        vec![
            Value::Integer(course_pk),
            Value::Text(term.academic_year.clone()),
            Value::Text(term.semester.clone()),
        ],
    )
}

pub fn student_gpa(
    conn: &Connection,
    student_pk: i64,
    academic_year: Option<&str>,
    semester: Option<&str>,
) -> StoreResult<f64> {
    let records = student_records(conn, student_pk, academic_year, semester)?;
    let credited: Vec<CreditedRecord> = records.iter().map(AcademicRecordRow::credited).collect();
    Ok(grade::cumulative_gpa(&credited))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemCounts {
    pub students: i64,
    pub staff: i64,
    pub courses: i64,
    pub enrollments: i64,
    pub records: i64,
}

pub fn system_counts(conn: &Connection) -> StoreResult<SystemCounts> {
    Ok(SystemCounts {
        students: count_people(conn, PersonKind::Student)?,
        staff: count_people(conn, PersonKind::Staff)?,
        courses: count_courses(conn)?,
        enrollments: count_enrollments(conn)?,
        records: conn.query_row("SELECT COUNT(*) FROM academic_records", [], |r| r.get(0))?,
    })
}

/// Grade counts over `academic_records`, A..F with zeros.
pub fn record_distribution(conn: &Connection) -> StoreResult<[(Grade, usize); 5]> {
    grade_counts(conn, "SELECT grade, COUNT(*) FROM academic_records GROUP BY grade")
}

/// Runs a `SELECT grade, COUNT(*) ... GROUP BY grade` query and folds it into
/// A..F order. Rows with an unrecognised grade are dropped.
pub(crate) fn grade_counts(conn: &Connection, sql: &str) -> StoreResult<[(Grade, usize); 5]> {
    let mut out = grade::grade_distribution(std::iter::empty());
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |r| {
            Ok((r.get::<_, Option<String>>(0)?, r.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (g, count) in rows {
        if let Some(g) = g.and_then(|s| s.parse::<Grade>().ok()) {
            out[g as usize].1 += count.max(0) as usize;
        }
    }
    Ok(out)
}
