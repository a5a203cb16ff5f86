//! The grade engine exposed as-is. No workspace or login needed.

use crate::grade::{self, CreditedRecord, RawScore};
use crate::ipc::error::{err, respond};
use crate::ipc::helpers::{score_param, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_compute(req: &Request) -> HandlerResult {
    let score = score_param(req)?;
    let g = score.grade();
    Ok(json!({
        "score": score.value(),
        "grade": g.as_str(),
        "gpaPoints": score.gpa_points(),
        "description": g.description(),
    }))
}

/// Never fails: anything that is not exactly a grade letter is described as
/// unknown.
fn handle_describe(req: &Request) -> HandlerResult {
    let g = req.params.get("grade").and_then(|v| v.as_str()).unwrap_or("");
    Ok(json!({ "grade": g, "description": grade::describe(g) }))
}

fn handle_validate(req: &Request) -> HandlerResult {
    // Shapes that can never be a score are simply invalid here.
    let valid = req
        .params
        .get("score")
        .and_then(RawScore::from_json)
        .map(|r| grade::validate_score(r))
        .unwrap_or(false);
    Ok(json!({ "valid": valid }))
}

fn handle_cumulative(req: &Request) -> HandlerResult {
    let Some(raw) = req.params.get("records") else {
        return Err(err(&req.id, "bad_params", "missing records", None));
    };
    let records: Vec<CreditedRecord> = serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("records must be [{{gpaPoints, credits}}]: {e}"),
            None,
        )
    })?;
    for (i, r) in records.iter().enumerate() {
        r.check().map_err(|e| {
            err(
                &req.id,
                "bad_params",
                e.to_string(),
                Some(json!({ "index": i })),
            )
        })?;
    }
    Ok(json!({
        "gpa": grade::cumulative_gpa(&records),
        "counted": records.iter().filter(|r| r.gpa_points.is_some() && r.credits.is_some()).count(),
    }))
}

pub fn try_handle(_state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let r = match req.method.as_str() {
        "grades.compute" => handle_compute(req),
        "grades.describe" => handle_describe(req),
        "grades.validate" => handle_validate(req),
        "grades.cumulative" => handle_cumulative(req),
        _ => return None,
    };
    Some(respond(&req.id, r))
}
