use crate::auth::Role;
use crate::ipc::error::respond;
use crate::ipc::helpers::{db, distribution_json, session, HandlerResult, StoreResultExt};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;

fn handle_summary(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let counts = store::system_counts(conn).frame(&req.id)?;
    let dist = store::record_distribution(conn).frame(&req.id)?;
    Ok(json!({
        "counts": counts,
        "gradeDistribution": distribution_json(&dist),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let r = match req.method.as_str() {
        "reports.summary" => handle_summary(state, req),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
