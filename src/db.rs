use crate::config::Config;
use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path, cfg: &Config) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(&cfg.database_file);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT UNIQUE,
            password_hash TEXT NOT NULL,
            user_type TEXT NOT NULL CHECK (user_type IN ('admin', 'staff', 'student')),
            full_name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL UNIQUE,
            pin TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            staff_id TEXT NOT NULL UNIQUE,
            pin TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT,
            department TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_code TEXT NOT NULL UNIQUE,
            course_name TEXT NOT NULL,
            credits INTEGER NOT NULL DEFAULT 3 CHECK (credits >= 1 AND credits <= 3),
            description TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_assignments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            staff_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            academic_year TEXT NOT NULL,
            semester TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(staff_id) REFERENCES staff(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            UNIQUE(staff_id, course_id, academic_year, semester)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_assignments_staff ON course_assignments(staff_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            academic_year TEXT NOT NULL,
            semester TEXT NOT NULL,
            enrollment_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            UNIQUE(student_id, course_id, academic_year, semester)
        )",
        [],
    )?;
    // Early workspaces predate enrollment status.
    ensure_enrollments_status(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id, academic_year, semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS academic_records(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            staff_id INTEGER,
            academic_year TEXT NOT NULL,
            semester TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0 AND score <= 100),
            grade TEXT NOT NULL,
            gpa_points REAL NOT NULL,
            credits INTEGER NOT NULL DEFAULT 3 CHECK (credits >= 1 AND credits <= 3),
            recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(staff_id) REFERENCES staff(id),
            UNIQUE(student_id, course_id, academic_year, semester)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_academic_records_student ON academic_records(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_academic_records_course ON academic_records(course_id, academic_year, semester)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_results(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            index_number TEXT NOT NULL,
            full_name TEXT NOT NULL,
            course TEXT NOT NULL,
            score INTEGER NOT NULL,
            grade TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_results_index ON student_results(index_number)",
        [],
    )?;

    Ok(())
}

fn ensure_enrollments_status(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "enrollments", "status")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE enrollments ADD COLUMN status TEXT NOT NULL DEFAULT 'active'",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("first");
        init_schema(&conn).expect("second");
        assert!(table_has_column(&conn, "enrollments", "status").expect("pragma"));
    }

    #[test]
    fn old_enrollments_table_gains_status() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE enrollments(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                academic_year TEXT NOT NULL,
                semester TEXT NOT NULL,
                enrollment_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO enrollments(student_id, course_id, academic_year, semester)
            VALUES (1, 1, '2024-2025', 'First Semester');",
        )
        .expect("legacy table");
        init_schema(&conn).expect("migrate");
        let status: String = conn
            .query_row("SELECT status FROM enrollments", [], |r| r.get(0))
            .expect("status");
        assert_eq!(status, "active");
    }

    #[test]
    fn record_score_range_is_enforced_by_schema() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("schema");
        conn.execute_batch(
            "INSERT INTO students(student_id, pin, full_name) VALUES ('12345678', '12345', 'A');
             INSERT INTO courses(course_code, course_name, credits) VALUES ('CS101', 'Intro', 3);",
        )
        .expect("seed");
        let res = conn.execute(
            "INSERT INTO academic_records(student_id, course_id, academic_year, semester, score, grade, gpa_points, credits)
             VALUES (1, 1, '2024-2025', 'First Semester', 101, 'A', 4.0, 3)",
            [],
        );
        assert!(res.is_err());
    }
}
