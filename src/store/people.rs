use super::{conflict_on_constraint, non_empty, StoreError, StoreResult};
use crate::auth::{self, generate_numeric_id, generate_pin};
use crate::config::Config;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

const MAX_ID_ATTEMPTS: usize = 32;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub user_type: String,
    pub full_name: String,
}

pub fn count_admins(conn: &Connection) -> StoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM users WHERE user_type = 'admin'",
        [],
        |r| r.get(0),
    )?)
}

/// An admin account registration. A blank `username` falls back to the
/// e-mail.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

fn user_column_taken(conn: &Connection, column: &str, value: &str) -> StoreResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM users WHERE {column} = ?"),
            [value],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// Registers an admin account. E-mail format, e-mail uniqueness and username
/// uniqueness are checked in that order, each with its own error.
pub fn create_user(conn: &Connection, new: &NewUser) -> StoreResult<UserRow> {
    let email = new.email.trim().to_ascii_lowercase();
    let full_name = new.full_name.trim();
    if email.is_empty() || new.password.is_empty() || full_name.is_empty() {
        return Err(StoreError::Invalid(
            "email, password and full name are required".into(),
        ));
    }
    if !auth::is_valid_email(&email) {
        return Err(StoreError::Invalid("invalid email format".into()));
    }
    let username = non_empty(new.username.as_deref()).unwrap_or_else(|| email.clone());
    if user_column_taken(conn, "email", &email)? {
        return Err(StoreError::Conflict("email already exists".into()));
    }
    if user_column_taken(conn, "username", &username)? {
        return Err(StoreError::Conflict("username already exists".into()));
    }
    conn.execute(
        "INSERT INTO users(username, email, password_hash, user_type, full_name)
         VALUES(?, ?, ?, 'admin', ?)",
        (&username, &email, auth::hash_password(&new.password), full_name),
    )
    .map_err(|e| conflict_on_constraint(e, "email or username already exists"))?;
    tracing::info!(username = %username, "admin account created");
    Ok(UserRow {
        id: conn.last_insert_rowid(),
        username,
        email: Some(email),
        user_type: "admin".into(),
        full_name: full_name.to_string(),
    })
}

/// The first admin account; the e-mail doubles as the username.
pub fn create_admin(
    conn: &Connection,
    email: &str,
    password: &str,
    full_name: &str,
) -> StoreResult<UserRow> {
    create_user(
        conn,
        &NewUser {
            username: None,
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        },
    )
}

pub fn authenticate_admin(
    conn: &Connection,
    email: &str,
    password: &str,
) -> StoreResult<Option<UserRow>> {
    let email = email.trim().to_ascii_lowercase();
    Ok(conn
        .query_row(
            "SELECT id, username, email, user_type, full_name
             FROM users
             WHERE email = ? AND password_hash = ? AND user_type = 'admin'",
            (&email, auth::hash_password(password)),
            |r| {
                Ok(UserRow {
                    id: r.get(0)?,
                    username: r.get(1)?,
                    email: r.get(2)?,
                    user_type: r.get(3)?,
                    full_name: r.get(4)?,
                })
            },
        )
        .optional()?)
}

/// Students and staff share one shape: a generated numeric id, a PIN, and
/// one kind-specific contact column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonKind {
    Student,
    Staff,
}

impl PersonKind {
    fn table(self) -> &'static str {
        match self {
            PersonKind::Student => "students",
            PersonKind::Staff => "staff",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            PersonKind::Student => "student_id",
            PersonKind::Staff => "staff_id",
        }
    }

    fn extra_column(self) -> &'static str {
        match self {
            PersonKind::Student => "phone",
            PersonKind::Staff => "department",
        }
    }

    pub fn entity(self) -> &'static str {
        match self {
            PersonKind::Student => "student",
            PersonKind::Staff => "staff",
        }
    }

    /// JSON key for the natural id.
    pub fn id_key(self) -> &'static str {
        match self {
            PersonKind::Student => "studentId",
            PersonKind::Staff => "staffId",
        }
    }

    /// JSON key for the kind-specific column.
    pub fn extra_key(self) -> &'static str {
        self.extra_column()
    }

    pub fn id_length(self, cfg: &Config) -> usize {
        match self {
            PersonKind::Student => cfg.student_id_length,
            PersonKind::Staff => cfg.staff_id_length,
        }
    }

    fn select_sql(self) -> String {
        format!(
            "SELECT id, {}, pin, full_name, email, {}, created_at FROM {}",
            self.id_column(),
            self.extra_column(),
            self.table()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonRow {
    pub id: i64,
    pub natural_id: String,
    pub pin: String,
    pub full_name: String,
    pub email: Option<String>,
    pub extra: Option<String>,
    pub created_at: String,
}

fn person_from_row(r: &Row<'_>) -> rusqlite::Result<PersonRow> {
    Ok(PersonRow {
        id: r.get(0)?,
        natural_id: r.get(1)?,
        pin: r.get(2)?,
        full_name: r.get(3)?,
        email: r.get(4)?,
        extra: r.get(5)?,
        created_at: r.get(6)?,
    })
}

#[derive(Debug, Clone, Default)]
pub struct NewPerson {
    pub full_name: String,
    pub email: Option<String>,
    pub extra: Option<String>,
}

/// Fields left `None` are unchanged; `Some("")` clears an optional column.
#[derive(Debug, Clone, Default)]
pub struct PersonPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub extra: Option<String>,
}

fn unique_natural_id(conn: &Connection, kind: PersonKind, len: usize) -> StoreResult<String> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE {} = ?",
        kind.table(),
        kind.id_column()
    );
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = generate_numeric_id(len);
        let taken: Option<i64> = conn
            .query_row(&sql, [&candidate], |r| r.get(0))
            .optional()?;
        if taken.is_none() {
            return Ok(candidate);
        }
    }
    Err(StoreError::Conflict(format!(
        "could not allocate a unique {} id",
        kind.entity()
    )))
}

fn check_email(email: &Option<String>) -> StoreResult<()> {
    match email {
        Some(e) if !auth::is_valid_email(e) => {
            Err(StoreError::Invalid("invalid email format".into()))
        }
        _ => Ok(()),
    }
}

/// Inserts a student or staff member with freshly generated credentials.
pub fn create_person(
    conn: &Connection,
    cfg: &Config,
    kind: PersonKind,
    new: &NewPerson,
) -> StoreResult<PersonRow> {
    let full_name = new.full_name.trim();
    if full_name.is_empty() {
        return Err(StoreError::Invalid("full name is required".into()));
    }
    let email = non_empty(new.email.as_deref());
    check_email(&email)?;
    let extra = non_empty(new.extra.as_deref());

    let natural_id = unique_natural_id(conn, kind, kind.id_length(cfg))?;
    let pin = generate_pin(cfg.pin_length);
    let sql = format!(
        "INSERT INTO {}({}, pin, full_name, email, {}) VALUES(?, ?, ?, ?, ?)",
        kind.table(),
        kind.id_column(),
        kind.extra_column()
    );
    conn.execute(&sql, (&natural_id, &pin, full_name, &email, &extra))
        .map_err(|e| conflict_on_constraint(e, "id already exists"))?;
    let id = conn.last_insert_rowid();
    tracing::info!(kind = kind.entity(), id, natural_id = %natural_id, "created");
    get_person(conn, kind, id)
}

pub fn get_person(conn: &Connection, kind: PersonKind, id: i64) -> StoreResult<PersonRow> {
    let sql = format!("{} WHERE id = ?", kind.select_sql());
    conn.query_row(&sql, [id], person_from_row)
        .optional()?
        .ok_or(StoreError::NotFound(kind.entity()))
}

pub fn find_person(
    conn: &Connection,
    kind: PersonKind,
    natural_id: &str,
) -> StoreResult<Option<PersonRow>> {
    let sql = format!("{} WHERE {} = ?", kind.select_sql(), kind.id_column());
    Ok(conn
        .query_row(&sql, [natural_id.trim()], person_from_row)
        .optional()?)
}

pub fn require_person(
    conn: &Connection,
    kind: PersonKind,
    natural_id: &str,
) -> StoreResult<PersonRow> {
    find_person(conn, kind, natural_id)?.ok_or(StoreError::NotFound(kind.entity()))
}

pub fn list_people(conn: &Connection, kind: PersonKind) -> StoreResult<Vec<PersonRow>> {
    let sql = format!("{} ORDER BY full_name, id", kind.select_sql());
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], person_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Case-insensitive substring match on name or natural id.
pub fn search_people(
    conn: &Connection,
    kind: PersonKind,
    query: &str,
) -> StoreResult<Vec<PersonRow>> {
    let pattern = format!("%{}%", query.trim().to_lowercase());
    let sql = format!(
        "{} WHERE lower(full_name) LIKE ?1 OR {} LIKE ?1 ORDER BY full_name, id",
        kind.select_sql(),
        kind.id_column()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([&pattern], person_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_person(
    conn: &Connection,
    kind: PersonKind,
    natural_id: &str,
    patch: &PersonPatch,
) -> StoreResult<PersonRow> {
    let current = require_person(conn, kind, natural_id)?;

    let full_name = match patch.full_name.as_deref().map(str::trim) {
        Some("") => return Err(StoreError::Invalid("full name must not be empty".into())),
        Some(v) => v.to_string(),
        None => current.full_name.clone(),
    };
    let email = match &patch.email {
        Some(v) => non_empty(Some(v.as_str())),
        None => current.email.clone(),
    };
    check_email(&email)?;
    let extra = match &patch.extra {
        Some(v) => non_empty(Some(v.as_str())),
        None => current.extra.clone(),
    };

    let sql = format!(
        "UPDATE {} SET full_name = ?, email = ?, {} = ? WHERE id = ?",
        kind.table(),
        kind.extra_column()
    );
    conn.execute(&sql, (&full_name, &email, &extra, current.id))?;
    get_person(conn, kind, current.id)
}

pub fn authenticate_person(
    conn: &Connection,
    kind: PersonKind,
    natural_id: &str,
    pin: &str,
) -> StoreResult<Option<PersonRow>> {
    Ok(find_person(conn, kind, natural_id)?.filter(|p| p.pin == pin.trim()))
}

pub fn count_people(conn: &Connection, kind: PersonKind) -> StoreResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}
