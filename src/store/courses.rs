use super::{conflict_on_constraint, non_empty, StoreError, StoreResult, Term};
use crate::config::Config;
use crate::grade;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRow {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub description: Option<String>,
    pub created_at: String,
}

fn course_from_row(r: &Row<'_>) -> rusqlite::Result<CourseRow> {
    Ok(CourseRow {
        id: r.get(0)?,
        course_code: r.get(1)?,
        course_name: r.get(2)?,
        credits: r.get(3)?,
        description: r.get(4)?,
        created_at: r.get(5)?,
    })
}

const COURSE_COLUMNS: &str =
    "SELECT id, course_code, course_name, credits, description, created_at FROM courses";

#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub course_code: String,
    pub course_name: String,
    pub credits: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub course_name: Option<String>,
    pub credits: Option<i64>,
    pub description: Option<String>,
}

fn check_credits(credits: i64) -> StoreResult<i64> {
    if !grade::CREDIT_RANGE.contains(&credits) {
        return Err(StoreError::Invalid(
            "credits must be between 1 and 3".into(),
        ));
    }
    Ok(credits)
}

pub fn add_course(conn: &Connection, cfg: &Config, new: &NewCourse) -> StoreResult<CourseRow> {
    let code = new.course_code.trim();
    let name = new.course_name.trim();
    if code.is_empty() || name.is_empty() {
        return Err(StoreError::Invalid(
            "course code and name are required".into(),
        ));
    }
    let credits = check_credits(new.credits.unwrap_or(cfg.default_credits))?;
    let description = non_empty(new.description.as_deref());
    conn.execute(
        "INSERT INTO courses(course_code, course_name, credits, description) VALUES(?, ?, ?, ?)",
        (code, name, credits, &description),
    )
    .map_err(|e| conflict_on_constraint(e, "course code already exists"))?;
    tracing::info!(course_code = code, credits, "course created");
    get_course(conn, conn.last_insert_rowid())
}

pub fn get_course(conn: &Connection, id: i64) -> StoreResult<CourseRow> {
    conn.query_row(
        &format!("{COURSE_COLUMNS} WHERE id = ?"),
        [id],
        course_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("course"))
}

pub fn find_course(conn: &Connection, code: &str) -> StoreResult<Option<CourseRow>> {
    Ok(conn
        .query_row(
            &format!("{COURSE_COLUMNS} WHERE course_code = ?"),
            [code.trim()],
            course_from_row,
        )
        .optional()?)
}

pub fn require_course(conn: &Connection, code: &str) -> StoreResult<CourseRow> {
    find_course(conn, code)?.ok_or(StoreError::NotFound("course"))
}

pub fn list_courses(conn: &Connection) -> StoreResult<Vec<CourseRow>> {
    let mut stmt = conn.prepare(&format!("{COURSE_COLUMNS} ORDER BY course_code"))?;
    let rows = stmt
        .query_map([], course_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_course(conn: &Connection, code: &str, patch: &CoursePatch) -> StoreResult<CourseRow> {
    let current = require_course(conn, code)?;
    let name = match patch.course_name.as_deref().map(str::trim) {
        Some("") => return Err(StoreError::Invalid("course name must not be empty".into())),
        Some(v) => v.to_string(),
        None => current.course_name.clone(),
    };
    let credits = match patch.credits {
        Some(c) => check_credits(c)?,
        None => current.credits,
    };
    let description = match &patch.description {
        Some(v) => non_empty(Some(v.as_str())),
        None => current.description.clone(),
    };
    conn.execute(
        "UPDATE courses SET course_name = ?, credits = ?, description = ? WHERE id = ?",
        (&name, credits, &description, current.id),
    )?;
    get_course(conn, current.id)
}

pub fn count_courses(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM courses", [], |r| r.get(0))?)
}

/// A course as taught by one staff member in one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffCourse {
    pub assignment_id: i64,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub academic_year: String,
    pub semester: String,
}

pub fn assign_course(
    conn: &Connection,
    staff_pk: i64,
    course_pk: i64,
    term: &Term,
) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO course_assignments(staff_id, course_id, academic_year, semester)
         VALUES(?, ?, ?, ?)",
        (staff_pk, course_pk, &term.academic_year, &term.semester),
    )
    .map_err(|e| {
        conflict_on_constraint(e, "course already assigned to this staff member for that term")
    })?;
    tracing::info!(staff_pk, course_pk, year = %term.academic_year, semester = %term.semester, "course assigned");
    Ok(conn.last_insert_rowid())
}

pub fn staff_courses(conn: &Connection, staff_pk: i64) -> StoreResult<Vec<StaffCourse>> {
    let mut stmt = conn.prepare(
        "SELECT ca.id, c.id, c.course_code, c.course_name, c.credits, ca.academic_year, ca.semester
         FROM course_assignments ca
         JOIN courses c ON c.id = ca.course_id
         WHERE ca.staff_id = ?
         ORDER BY ca.academic_year DESC, ca.semester, c.course_code",
    )?;
    let rows = stmt
        .query_map([staff_pk], |r| {
            Ok(StaffCourse {
                assignment_id: r.get(0)?,
                course_id: r.get(1)?,
                course_code: r.get(2)?,
                course_name: r.get(3)?,
                credits: r.get(4)?,
                academic_year: r.get(5)?,
                semester: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn is_assigned(
    conn: &Connection,
    staff_pk: i64,
    course_pk: i64,
    term: &Term,
) -> StoreResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM course_assignments
             WHERE staff_id = ? AND course_id = ? AND academic_year = ? AND semester = ?",
            (staff_pk, course_pk, &term.academic_year, &term.semester),
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// A student's own view of one enrollment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRow {
    pub id: i64,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub credits: i64,
    pub academic_year: String,
    pub semester: String,
    pub status: String,
    pub enrollment_date: String,
}

/// A course roster entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub id: i64,
    pub student_id: String,
    pub full_name: String,
    pub email: Option<String>,
    pub status: String,
}

pub fn enroll_student(
    conn: &Connection,
    student_pk: i64,
    course_pk: i64,
    term: &Term,
) -> StoreResult<i64> {
    if is_enrolled(conn, student_pk, course_pk, term)? {
        return Err(StoreError::Conflict(
            "already enrolled in this course for that term".into(),
        ));
    }
    conn.execute(
        "INSERT INTO enrollments(student_id, course_id, academic_year, semester)
         VALUES(?, ?, ?, ?)",
        (student_pk, course_pk, &term.academic_year, &term.semester),
    )
    .map_err(|e| conflict_on_constraint(e, "already enrolled in this course for that term"))?;
    tracing::info!(student_pk, course_pk, year = %term.academic_year, semester = %term.semester, "enrolled");
    Ok(conn.last_insert_rowid())
}

/// Removes an enrollment. Refused once a score exists for it, so a stored
/// record never loses its enrollment.
pub fn unenroll_student(
    conn: &Connection,
    student_pk: i64,
    course_pk: i64,
    term: &Term,
) -> StoreResult<()> {
    if !is_enrolled(conn, student_pk, course_pk, term)? {
        return Err(StoreError::NotFound("enrollment"));
    }
    let scored: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM academic_records
             WHERE student_id = ? AND course_id = ? AND academic_year = ? AND semester = ?",
            (student_pk, course_pk, &term.academic_year, &term.semester),
            |r| r.get(0),
        )
        .optional()?;
    if scored.is_some() {
        return Err(StoreError::Conflict(
            "a score has already been recorded for this enrollment".into(),
        ));
    }
    conn.execute(
        "DELETE FROM enrollments
         WHERE student_id = ? AND course_id = ? AND academic_year = ? AND semester = ?",
        (student_pk, course_pk, &term.academic_year, &term.semester),
    )?;
    tracing::info!(student_pk, course_pk, "unenrolled");
    Ok(())
}

pub fn is_enrolled(
    conn: &Connection,
    student_pk: i64,
    course_pk: i64,
    term: &Term,
) -> StoreResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM enrollments
             WHERE student_id = ? AND course_id = ? AND academic_year = ? AND semester = ?",
            (student_pk, course_pk, &term.academic_year, &term.semester),
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

pub fn student_enrollments(conn: &Connection, student_pk: i64) -> StoreResult<Vec<EnrollmentRow>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, c.id, c.course_code, c.course_name, c.credits,
                e.academic_year, e.semester, e.status, e.enrollment_date
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         WHERE e.student_id = ?
         ORDER BY e.academic_year DESC, e.semester, c.course_code",
    )?;
    let rows = stmt
        .query_map([student_pk], |r| {
            Ok(EnrollmentRow {
                id: r.get(0)?,
                course_id: r.get(1)?,
                course_code: r.get(2)?,
                course_name: r.get(3)?,
                credits: r.get(4)?,
                academic_year: r.get(5)?,
                semester: r.get(6)?,
                status: r.get(7)?,
                enrollment_date: r.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn course_enrollments(
    conn: &Connection,
    course_pk: i64,
    term: &Term,
) -> StoreResult<Vec<RosterRow>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, s.student_id, s.full_name, s.email, e.status
         FROM enrollments e
         JOIN students s ON s.id = e.student_id
         WHERE e.course_id = ? AND e.academic_year = ? AND e.semester = ?
         ORDER BY s.full_name, s.student_id",
    )?;
    let rows = stmt
        .query_map(
            (course_pk, &term.academic_year, &term.semester),
            |r| {
                Ok(RosterRow {
                    id: r.get(0)?,
                    student_id: r.get(1)?,
                    full_name: r.get(2)?,
                    email: r.get(3)?,
                    status: r.get(4)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_enrollments(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM enrollments", [], |r| r.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{cfg, conn};
    use crate::store::{create_person, NewPerson, PersonKind};

    fn term() -> Term {
        Term::new("2024-2025", "First Semester").expect("term")
    }

    #[test]
    fn course_defaults_and_credit_bounds() {
        let conn = conn();
        let cfg = cfg();
        let c = add_course(
            &conn,
            &cfg,
            &NewCourse {
                course_code: "CS101".into(),
                course_name: "Intro to Computing".into(),
                ..Default::default()
            },
        )
        .expect("add");
        assert_eq!(c.credits, 3);
        assert_eq!(c.description, None);

        let bad = add_course(
            &conn,
            &cfg,
            &NewCourse {
                course_code: "CS102".into(),
                course_name: "Too Heavy".into(),
                credits: Some(4),
                description: None,
            },
        );
        assert!(matches!(bad, Err(StoreError::Invalid(_))));

        let dup = add_course(
            &conn,
            &cfg,
            &NewCourse {
                course_code: "CS101".into(),
                course_name: "Again".into(),
                ..Default::default()
            },
        );
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        let updated = update_course(
            &conn,
            "CS101",
            &CoursePatch {
                credits: Some(2),
                description: Some("Basics".into()),
                ..Default::default()
            },
        )
        .expect("update");
        assert_eq!(updated.credits, 2);
        assert_eq!(updated.course_name, "Intro to Computing");
        assert_eq!(list_courses(&conn).expect("list").len(), 1);
    }

    #[test]
    fn enrollment_lifecycle() {
        let conn = conn();
        let cfg = cfg();
        let student = create_person(
            &conn,
            &cfg,
            PersonKind::Student,
            &NewPerson {
                full_name: "Ada".into(),
                ..Default::default()
            },
        )
        .expect("student");
        let course = add_course(
            &conn,
            &cfg,
            &NewCourse {
                course_code: "MA101".into(),
                course_name: "Calculus".into(),
                ..Default::default()
            },
        )
        .expect("course");

        enroll_student(&conn, student.id, course.id, &term()).expect("enroll");
        let again = enroll_student(&conn, student.id, course.id, &term());
        assert!(matches!(again, Err(StoreError::Conflict(_))));

        let mine = student_enrollments(&conn, student.id).expect("mine");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].status, "active");
        assert_eq!(mine[0].course_code, "MA101");

        let roster = course_enrollments(&conn, course.id, &term()).expect("roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].student_id, student.natural_id);

        unenroll_student(&conn, student.id, course.id, &term()).expect("unenroll");
        let gone = unenroll_student(&conn, student.id, course.id, &term());
        assert!(matches!(gone, Err(StoreError::NotFound("enrollment"))));
    }

    #[test]
    fn assignments_are_unique_per_term() {
        let conn = conn();
        let cfg = cfg();
        let staff = create_person(
            &conn,
            &cfg,
            PersonKind::Staff,
            &NewPerson {
                full_name: "Grace".into(),
                ..Default::default()
            },
        )
        .expect("staff");
        let course = add_course(
            &conn,
            &cfg,
            &NewCourse {
                course_code: "PH101".into(),
                course_name: "Physics".into(),
                credits: Some(1),
                description: None,
            },
        )
        .expect("course");
        assign_course(&conn, staff.id, course.id, &term()).expect("assign");
        assert!(is_assigned(&conn, staff.id, course.id, &term()).expect("check"));
        let dup = assign_course(&conn, staff.id, course.id, &term());
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        let other_term = Term::new("2024-2025", "Second Semester").expect("term");
        assert!(!is_assigned(&conn, staff.id, course.id, &other_term).expect("check"));

        let courses = staff_courses(&conn, staff.id).expect("courses");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].credits, 1);
    }

    #[test]
    fn term_requires_both_parts() {
        assert!(Term::new(" ", "First Semester").is_err());
        assert!(Term::new("2024-2025", "").is_err());
    }
}
