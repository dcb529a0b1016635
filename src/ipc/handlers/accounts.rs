use crate::auth;
use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::handlers::students::ProfilePatch;
use crate::ipc::helpers::{non_empty, parse_params, required_text, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::model::{Role, StudentRecord};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupParams {
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
    admin_password: Option<String>,
    #[serde(flatten)]
    profile: ProfilePatch,
}

#[derive(Debug, Deserialize)]
struct LoginParams {
    email: Option<String>,
    password: Option<String>,
}

fn required_secret(value: Option<String>, key: &str) -> Result<String, HandlerErr> {
    value
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

fn already_exists() -> HandlerErr {
    HandlerErr::new("already_exists", "User already exists")
}

fn hash(password: &str) -> Result<String, HandlerErr> {
    auth::hash_password(password).map_err(|e| HandlerErr::store("hash_failed", e))
}

fn signup(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: SignupParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let password = required_secret(p.password, "password")?;
    let role = match non_empty(p.role) {
        None => Role::Student,
        Some(r) => Role::parse(&r)
            .ok_or_else(|| HandlerErr::bad_params("role must be student or admin"))?,
    };

    let existing = db::find_student(conn, &email)
        .map_err(|e| HandlerErr::store("db_query_failed", e))?;
    if existing.is_some() {
        return Err(already_exists());
    }

    let mut record = StudentRecord::new(email, hash(&password)?, role);
    if role == Role::Admin {
        let admin_password = required_secret(p.admin_password, "adminPassword")?;
        record.admin_password_hash = Some(hash(&admin_password)?);
    }
    p.profile.apply(&mut record)?;

    let inserted = db::insert_student(conn, &record)
        .map_err(|e| HandlerErr::store("db_update_failed", e))?;
    if !inserted {
        return Err(already_exists());
    }
    log::info!("registered {} ({})", record.email, role.as_str());

    Ok(json!({
        "success": true,
        "message": "User registered successfully",
    }))
}

fn login(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: LoginParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let password = p.password.unwrap_or_default();

    let record = db::find_student(conn, &email)
        .map_err(|e| HandlerErr::store("db_query_failed", e))?;
    match record {
        Some(r) if auth::verify_password(&r.password_hash, &password) => Ok(json!({
            "success": true,
            "message": "Login successful",
            "role": r.role.as_str(),
        })),
        _ => {
            log::warn!("login rejected for {}", email);
            Err(HandlerErr::auth_failed())
        }
    }
}

fn admin_login(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let p: LoginParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let password = p.password.unwrap_or_default();

    let record = db::find_student(conn, &email)
        .map_err(|e| HandlerErr::store("db_query_failed", e))?;
    let verified = record
        .filter(|r| r.role == Role::Admin)
        .and_then(|r| r.admin_password_hash)
        .map(|hash| auth::verify_password(&hash, &password))
        .unwrap_or(false);
    if !verified {
        log::warn!("admin login rejected for {}", email);
        return Err(HandlerErr::auth_failed());
    }
    Ok(json!({ "success": true, "message": "Login successful" }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.signup" => Some(with_conn(state, req, signup)),
        "auth.login" => Some(with_conn(state, req, login)),
        "auth.adminLogin" => Some(with_conn(state, req, admin_login)),
        _ => None,
    }
}
