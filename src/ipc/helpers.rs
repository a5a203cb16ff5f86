use crate::auth::Role;
use crate::grade::{self, Grade, RawScore, Score};
use crate::ipc::error::{err, store_err};
use crate::ipc::types::{AppState, Request, Session};
use crate::store::{StoreResult, Term};
use rusqlite::Connection;
use serde_json::Value;

/// `Ok` is the `result` payload, `Err` a finished error frame.
pub type HandlerResult = Result<Value, Value>;

pub trait StoreResultExt<T> {
    fn frame(self, id: &str) -> Result<T, Value>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn frame(self, id: &str) -> Result<T, Value> {
        self.map_err(|e| store_err(id, e))
    }
}

pub fn db<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// The current session, if its role is one of `roles`.
pub fn session<'a>(
    state: &'a AppState,
    req: &Request,
    roles: &[Role],
) -> Result<&'a Session, Value> {
    let Some(s) = state.session.as_ref() else {
        return Err(err(&req.id, "not_authenticated", "log in first", None));
    };
    if !roles.contains(&s.role) {
        tracing::warn!(method = %req.method, role = %s.role, "forbidden");
        return Err(err(
            &req.id,
            "forbidden",
            format!("{} cannot call {}", s.role, req.method),
            None,
        ));
    }
    Ok(s)
}

/// Required, trimmed, non-empty string param.
pub fn str_param<'a>(req: &'a Request, key: &str) -> Result<&'a str, Value> {
    let Some(v) = req.params.get(key).and_then(|v| v.as_str()) else {
        return Err(err(&req.id, "bad_params", format!("missing {key}"), None));
    };
    let v = v.trim();
    if v.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{key} must not be empty"),
            None,
        ));
    }
    Ok(v)
}

/// Optional string param; blank counts as absent.
pub fn opt_str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// For patches: present-but-blank is kept so it can clear a column.
pub fn patch_str_param(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Optional integer param. Numeric strings are accepted; anything else that
/// is present is rejected.
pub fn opt_int_param(req: &Request, key: &str) -> Result<Option<i64>, Value> {
    let Some(v) = req.params.get(key) else {
        return Ok(None);
    };
    let parsed = match v {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| err(&req.id, "bad_params", format!("{key} must be an integer"), None))
}

pub fn term_param(req: &Request) -> Result<Term, Value> {
    let year = str_param(req, "academicYear")?;
    let semester = str_param(req, "semester")?;
    Term::new(year, semester).frame(&req.id)
}

/// Admins see every course; staff only the ones assigned to them for `term`.
pub fn check_course_access(
    conn: &Connection,
    req: &Request,
    s: &Session,
    course_pk: i64,
    term: &Term,
) -> Result<(), Value> {
    if s.role == Role::Admin
        || crate::store::is_assigned(conn, s.user_pk, course_pk, term).frame(&req.id)?
    {
        return Ok(());
    }
    tracing::warn!(login_id = %s.login_id, course_pk, "course not assigned");
    Err(err(
        &req.id,
        "forbidden",
        "course is not assigned to you for that term",
        None,
    ))
}

/// The `score` param, parsed. Accepts a number or numeric text.
pub fn score_param(req: &Request) -> Result<Score, Value> {
    let Some(v) = req.params.get("score") else {
        return Err(err(&req.id, "bad_params", "missing score", None));
    };
    let raw = RawScore::from_json(v)
        .ok_or_else(|| err(&req.id, "bad_params", "score must be a string or number", None))?;
    grade::parse_score(raw).map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

/// `{"A": n, ..., "F": n}`.
pub fn distribution_json(dist: &[(Grade, usize); 5]) -> Value {
    Value::Object(
        dist.iter()
            .map(|(g, n)| (g.as_str().to_string(), Value::from(*n)))
            .collect(),
    )
}
