//! `legacy.*`: the flat `student_results` table, file import and the
//! plain-text summary report.

use crate::auth::Role;
use crate::ipc::error::{err, respond};
use crate::ipc::helpers::{
    db, distribution_json, opt_str_param, score_param, session, str_param, HandlerResult,
    StoreResultExt,
};
use crate::ipc::types::{AppState, Request};
use crate::legacy;
use crate::store;
use serde_json::json;
use std::path::PathBuf;

/// Relative paths are taken from the workspace root.
fn workspace_path(state: &AppState, raw: &str) -> PathBuf {
    let p = PathBuf::from(raw);
    match &state.workspace {
        Some(ws) if p.is_relative() => ws.join(p),
        _ => p,
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let index = str_param(req, "indexNumber")?;
    let name = str_param(req, "fullName")?;
    let course = str_param(req, "course")?;
    let score = score_param(req)?;
    if store::legacy_exists(conn, index).frame(&req.id)? {
        return Err(err(
            &req.id,
            "conflict",
            format!("index number {index} already exists"),
            None,
        ));
    }
    let id = store::insert_legacy_result(conn, index, name, course, score).frame(&req.id)?;
    Ok(json!({
        "id": id,
        "grade": score.grade().as_str(),
    }))
}

fn handle_list(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let items = store::list_legacy_results(conn).frame(&req.id)?;
    Ok(json!({ "total": items.len(), "items": items }))
}

fn handle_get(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let index = str_param(req, "indexNumber")?;
    let row = store::find_legacy_result(conn, index)
        .frame(&req.id)?
        .ok_or_else(|| err(&req.id, "not_found", format!("no result for {index}"), None))?;
    Ok(json!({ "result": row }))
}

fn handle_update_score(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let index = str_param(req, "indexNumber")?;
    let score = score_param(req)?;
    let updated = store::update_legacy_score(conn, index, score).frame(&req.id)?;
    Ok(json!({
        "updated": updated,
        "score": score.value(),
        "grade": score.grade().as_str(),
    }))
}

fn handle_distribution(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let total = store::legacy_total(conn).frame(&req.id)?;
    let dist = store::legacy_distribution(conn).frame(&req.id)?;
    Ok(json!({
        "total": total,
        "gradeDistribution": distribution_json(&dist),
    }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let index = str_param(req, "indexNumber")?;
    let removed = store::delete_legacy_result(conn, index).frame(&req.id)?;
    tracing::info!(index_number = index, removed, "legacy result deleted");
    Ok(json!({ "removed": removed }))
}

fn handle_clear(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let removed = store::clear_legacy_results(conn).frame(&req.id)?;
    tracing::info!(removed, "legacy results cleared");
    Ok(json!({ "removed": removed }))
}

fn handle_import(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let path = workspace_path(state, str_param(req, "path")?);
    let parsed = legacy::parse_results_file(&path).map_err(|e| {
        let code = if e.downcast_ref::<std::io::Error>().is_some() {
            "io_failed"
        } else {
            "bad_params"
        };
        err(
            &req.id,
            code,
            format!("{e:#}"),
            Some(json!({ "path": path.to_string_lossy() })),
        )
    })?;
    for issue in &parsed.issues {
        tracing::warn!(path = %path.display(), line = issue.line, message = %issue.message, "skipped line");
    }
    let outcome = store::import_legacy_lines(conn, &parsed.lines).frame(&req.id)?;
    tracing::info!(
        path = %path.display(),
        inserted = outcome.inserted,
        duplicates = outcome.duplicates.len(),
        skipped = parsed.issues.len(),
        "legacy import"
    );
    Ok(json!({
        "inserted": outcome.inserted,
        "duplicates": outcome.duplicates.len(),
        "duplicateIndexNumbers": outcome.duplicates,
        "skipped": parsed.issues.len(),
        "issues": parsed.issues,
    }))
}

fn handle_write_report(state: &mut AppState, req: &Request) -> HandlerResult {
    session(state, req, &[Role::Admin])?;
    let conn = db(state, req)?;
    let now = chrono::Local::now().naive_local();
    let path = match opt_str_param(req, "path") {
        Some(p) => workspace_path(state, p),
        None => workspace_path(state, &state.config.reports_dir).join(legacy::default_report_name(now)),
    };
    let total = store::legacy_total(conn).frame(&req.id)?;
    let dist = store::legacy_distribution(conn).frame(&req.id)?;
    legacy::write_summary_report(&path, total, &dist, now).map_err(|e| {
        err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": path.to_string_lossy() })),
        )
    })?;
    tracing::info!(path = %path.display(), total, "summary report written");
    Ok(json!({
        "path": path.to_string_lossy(),
        "total": total,
        "gradeDistribution": distribution_json(&dist),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let r = match req.method.as_str() {
        "legacy.create" => handle_create(state, req),
        "legacy.list" => handle_list(state, req),
        "legacy.get" => handle_get(state, req),
        "legacy.updateScore" => handle_update_score(state, req),
        "legacy.distribution" => handle_distribution(state, req),
        "legacy.delete" => handle_delete(state, req),
        "legacy.clear" => handle_clear(state, req),
        "legacy.import" => handle_import(state, req),
        "legacy.writeReport" => handle_write_report(state, req),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
