use crate::attendance;
use crate::db;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{CohortFilter, StudentRecord};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use std::rc::Rc;

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state.db.as_ref().ok_or_else(HandlerErr::no_workspace)
}

pub fn parse_params<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, HandlerErr> {
    let value = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params.clone()
    };
    serde_json::from_value(value).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

/// Blank strings count as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_text(value: Option<String>, key: &str) -> Result<String, HandlerErr> {
    non_empty(value).ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, HandlerErr> {
    attendance::parse_attendance_date(raw).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

pub fn load_student(conn: &Connection, email: &str) -> Result<StudentRecord, HandlerErr> {
    db::find_student(conn, email)
        .map_err(|e| HandlerErr::store("db_query_failed", e))?
        .ok_or_else(|| HandlerErr::not_found("Student not found"))
}

pub fn save_student(conn: &Connection, record: &StudentRecord) -> Result<(), HandlerErr> {
    db::save_student(conn, record).map_err(|e| HandlerErr::store("db_update_failed", e))
}

/// Cohort snapshot through the read-through cache.
pub fn load_cohort(
    state: &mut AppState,
    filter: &CohortFilter,
) -> Result<Rc<Vec<StudentRecord>>, HandlerErr> {
    let AppState { db, cohorts, .. } = state;
    let conn = db.as_ref().ok_or_else(HandlerErr::no_workspace)?;
    cohorts
        .get_or_load(filter, |f| db::list_students(conn, f))
        .map_err(|e| HandlerErr::store("db_query_failed", e))
}

/// Load, mutate and save one record, 404 when it does not exist.
pub fn update_student<F>(
    conn: &Connection,
    email: &str,
    mutate: F,
) -> Result<StudentRecord, HandlerErr>
where
    F: FnOnce(&mut StudentRecord) -> Result<(), HandlerErr>,
{
    let mut record = load_student(conn, email)?;
    mutate(&mut record)?;
    save_student(conn, &record)?;
    Ok(record)
}

/// Runs a handler body against the open workspace and wraps its outcome.
pub fn with_conn<F>(state: &mut AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    let result = require_db(state).and_then(|conn| f(conn, &req.params));
    respond(req, result)
}

pub fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}
