use crate::auth::{check_numeric_credentials, Role};
use crate::ipc::error::{err, respond};
use crate::ipc::helpers::{db, session, str_param, HandlerResult, StoreResultExt};
use crate::ipc::types::{AppState, Request, Session};
use crate::store::{self, NewUser, PersonKind};
use serde_json::json;
use uuid::Uuid;

fn handle_setup_admin(state: &mut AppState, req: &Request) -> HandlerResult {
    let conn = db(state, req)?;
    if store::count_admins(conn).frame(&req.id)? > 0 {
        return Err(err(&req.id, "conflict", "an admin account already exists", None));
    }
    let email = str_param(req, "email")?;
    let password = str_param(req, "password")?;
    let full_name = str_param(req, "fullName")?;
    let user = store::create_admin(conn, email, password, full_name).frame(&req.id)?;
    tracing::info!(email = ?user.email, "initial admin created");
    Ok(json!({ "user": user }))
}

/// Further admin accounts, each with its own username.
fn handle_users_create(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let new = NewUser {
        username: Some(str_param(req, "username")?.to_string()),
        email: str_param(req, "email")?.to_string(),
        password: str_param(req, "password")?.to_string(),
        full_name: str_param(req, "fullName")?.to_string(),
    };
    let user = store::create_user(conn, &new).frame(&req.id)?;
    Ok(json!({ "user": user }))
}

fn invalid_credentials(req: &Request, role: Role) -> serde_json::Value {
    tracing::warn!(%role, "login failed");
    err(&req.id, "invalid_credentials", "invalid credentials", None)
}

fn handle_login(state: &mut AppState, req: &Request) -> HandlerResult {
    let role: Role = str_param(req, "role")?
        .parse()
        .map_err(|e: String| err(&req.id, "bad_params", e, None))?;
    let conn = db(state, req)?;

    let (user_pk, login_id, full_name) = match role {
        Role::Admin => {
            let email = str_param(req, "email")?;
            let password = str_param(req, "password")?;
            let user = store::authenticate_admin(conn, email, password)
                .frame(&req.id)?
                .ok_or_else(|| invalid_credentials(req, role))?;
            (user.id, user.email.unwrap_or(user.username), user.full_name)
        }
        Role::Staff | Role::Student => {
            let (kind, key) = if role == Role::Staff {
                (PersonKind::Staff, "staffId")
            } else {
                (PersonKind::Student, "studentId")
            };
            let id = opt_trimmed(req, key);
            let pin = opt_trimmed(req, "pin");
            check_numeric_credentials(
                id,
                pin,
                kind.id_length(&state.config),
                state.config.pin_length,
            )
            .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))?;
            let person = store::authenticate_person(conn, kind, id, pin)
                .frame(&req.id)?
                .ok_or_else(|| invalid_credentials(req, role))?;
            (person.id, person.natural_id, person.full_name)
        }
    };

    let session = Session {
        token: Uuid::new_v4().to_string(),
        role,
        user_pk,
        login_id,
        full_name,
    };
    tracing::info!(%role, login_id = %session.login_id, token = %session.token, "logged in");
    let out = json!({ "session": &session });
    state.session = Some(session);
    Ok(out)
}

fn opt_trimmed<'a>(req: &'a Request, key: &str) -> &'a str {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or("")
}

fn handle_logout(state: &mut AppState, _req: &Request) -> HandlerResult {
    let prev = state.session.take();
    if let Some(s) = &prev {
        tracing::info!(role = %s.role, login_id = %s.login_id, "logged out");
    }
    Ok(json!({ "loggedOut": prev.is_some() }))
}

fn handle_whoami(state: &mut AppState, _req: &Request) -> HandlerResult {
    Ok(json!({ "session": state.session }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let r = match req.method.as_str() {
        "auth.setupAdmin" => handle_setup_admin(state, req),
        "auth.login" => handle_login(state, req),
        "auth.logout" => handle_logout(state, req),
        "auth.whoami" => handle_whoami(state, req),
        "users.create" => handle_users_create(state, req),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
