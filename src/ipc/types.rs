use crate::cache::CohortCache;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub cohorts: CohortCache,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            cohorts: CohortCache::new(),
        }
    }
}
