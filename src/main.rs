mod auth;
mod config;
mod db;
mod grade;
mod ipc;
mod legacy;
mod store;

use serde_json::json;
use std::io::{self, BufRead, Write};

/// Filter directives for the stderr log, e.g. `resultsd=debug`.
const LOG_ENV: &str = "RESULTSD_LOG";

fn main() {
    // stdout carries the protocol, so logs go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| "resultsd=info".into()),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resultsd starting");

    let mut state = ipc::AppState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                // No id to echo back.
                tracing::warn!(error = %e, "bad request line");
                json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                })
            }
        };

        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, exiting");
}
