use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

/// Methods after which cached cohort snapshots may be stale.
const MUTATING_METHODS: &[&str] = &[
    "workspace.select",
    "auth.signup",
    "students.updateProfile",
    "subjects.replace",
    "scores.set",
    "attendance.mark",
    "attendance.updateAll",
    "messages.update",
    "messages.append",
    "messages.sendToDepartment",
    "accomplishments.update",
    "accomplishments.append",
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    log::debug!("request {} {}", req.id, req.method);
    let resp = dispatch(state, &req);
    // Batches can fail halfway and still have written some records.
    if MUTATING_METHODS.contains(&req.method.as_str()) {
        state.cohorts.invalidate();
    }
    resp
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::accounts::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::notes::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::analytics::try_handle(state, req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
