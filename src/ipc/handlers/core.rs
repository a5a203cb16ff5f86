use crate::config::Config;
use crate::db;
use crate::ipc::error::{err, ok, respond};
use crate::ipc::helpers::{str_param, HandlerResult, StoreResultExt};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "loggedIn": state.session.is_some(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> HandlerResult {
    let path = PathBuf::from(str_param(req, "path")?);

    let config = Config::load(&path).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid workspace config: {e:#}"),
            Some(json!({ "file": crate::config::CONFIG_FILE })),
        )
    })?;
    let conn = db::open_db(&path, &config)
        .map_err(|e| err(&req.id, "db_open_failed", format!("{e:#}"), None))?;
    let needs_admin_setup = store::count_admins(&conn).frame(&req.id)? == 0;

    tracing::info!(workspace = %path.display(), needs_admin_setup, "workspace opened");
    // A new workspace never inherits the previous login.
    state.session = None;
    state.workspace = Some(path.clone());
    state.config = config;
    state.db = Some(conn);

    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "needsAdminSetup": needs_admin_setup,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(respond(&req.id, handle_workspace_select(state, req))),
        _ => None,
    }
}
