//! `students.*` and `staff.*`: one code path, keyed by [`PersonKind`].

use crate::auth::Role;
use crate::ipc::error::respond;
use crate::ipc::helpers::{
    db, patch_str_param, session, str_param, HandlerResult, StoreResultExt,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, NewPerson, PersonKind, PersonPatch, PersonRow};
use serde_json::json;

fn person_json(kind: PersonKind, p: &PersonRow) -> serde_json::Value {
    let mut v = json!({
        "id": p.id,
        "fullName": p.full_name,
        "email": p.email,
        "createdAt": p.created_at,
    });
    v[kind.id_key()] = json!(p.natural_id);
    v[kind.extra_key()] = json!(p.extra);
    v
}

fn handle_create(state: &mut AppState, req: &Request, kind: PersonKind) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let new = NewPerson {
        full_name: str_param(req, "fullName")?.to_string(),
        email: patch_str_param(req, "email"),
        extra: patch_str_param(req, kind.extra_key()),
    };
    let p = store::create_person(conn, &state.config, kind, &new).frame(&req.id)?;
    // The PIN is only ever shown to the admin who creates the account or
    // asks for credentials.
    Ok(json!({
        kind.entity(): person_json(kind, &p),
        "credentials": { kind.id_key(): p.natural_id, "pin": p.pin },
    }))
}

fn handle_list(state: &mut AppState, req: &Request, kind: PersonKind) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let rows = store::list_people(conn, kind).frame(&req.id)?;
    let items: Vec<_> = rows.iter().map(|p| person_json(kind, p)).collect();
    Ok(json!({ "items": items, "total": items.len() }))
}

fn handle_search(state: &mut AppState, req: &Request, kind: PersonKind) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let q = str_param(req, "query")?;
    let rows = store::search_people(conn, kind, q).frame(&req.id)?;
    let items: Vec<_> = rows.iter().map(|p| person_json(kind, p)).collect();
    Ok(json!({ "items": items }))
}

fn handle_get(state: &mut AppState, req: &Request, kind: PersonKind) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let id = str_param(req, kind.id_key())?;
    let p = store::require_person(conn, kind, id).frame(&req.id)?;
    Ok(json!({ kind.entity(): person_json(kind, &p) }))
}

fn handle_update(state: &mut AppState, req: &Request, kind: PersonKind) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let id = str_param(req, kind.id_key())?;
    let patch = PersonPatch {
        full_name: patch_str_param(req, "fullName"),
        email: patch_str_param(req, "email"),
        extra: patch_str_param(req, kind.extra_key()),
    };
    let p = store::update_person(conn, kind, id, &patch).frame(&req.id)?;
    tracing::info!(kind = kind.entity(), natural_id = %p.natural_id, "updated");
    Ok(json!({ kind.entity(): person_json(kind, &p) }))
}

fn handle_credentials(state: &mut AppState, req: &Request, kind: PersonKind) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let id = str_param(req, kind.id_key())?;
    let p = store::require_person(conn, kind, id).frame(&req.id)?;
    Ok(json!({
        kind.id_key(): p.natural_id,
        "fullName": p.full_name,
        "pin": p.pin,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (family, action) = req.method.split_once('.')?;
    let kind = match family {
        "students" => PersonKind::Student,
        "staff" => PersonKind::Staff,
        _ => return None,
    };
    let r = match action {
        "create" => handle_create(state, req, kind),
        "list" => handle_list(state, req, kind),
        "search" => handle_search(state, req, kind),
        "get" => handle_get(state, req, kind),
        "update" => handle_update(state, req, kind),
        "credentials" => handle_credentials(state, req, kind),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
