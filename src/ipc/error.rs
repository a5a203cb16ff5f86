use crate::store::StoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Handlers build `Result<result, error frame>`; this flattens it to a frame.
pub fn respond(id: &str, r: Result<serde_json::Value, serde_json::Value>) -> serde_json::Value {
    match r {
        Ok(v) => ok(id, v),
        Err(e) => e,
    }
}

pub fn store_err(id: &str, e: StoreError) -> serde_json::Value {
    match e {
        StoreError::NotFound(what) => err(
            id,
            "not_found",
            format!("{what} not found"),
            Some(json!({ "entity": what })),
        ),
        StoreError::Conflict(m) => err(id, "conflict", m, None),
        StoreError::Invalid(m) => err(id, "bad_params", m, None),
        StoreError::Db(e) => {
            tracing::error!(error = %e, "database error");
            err(id, "db_query_failed", e.to_string(), None)
        }
    }
}
