use std::path::PathBuf;

use crate::auth::Role;
use crate::config::Config;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The identity behind every request until `auth.logout`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub role: Role,
    /// Row id in `users`, `staff` or `students`, depending on `role`.
    #[serde(skip)]
    pub user_pk: i64,
    /// E-mail for admins, the 8-digit id otherwise.
    pub login_id: String,
    pub full_name: String,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: Config,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            config: Config::default(),
            session: None,
        }
    }
}
