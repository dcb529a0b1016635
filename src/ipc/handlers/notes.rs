use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    non_empty, parse_params, required_text, save_student, update_student, with_conn,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{CohortFilter, StudentRecord};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

/// Which free-text list of a record a request targets.
#[derive(Debug, Clone, Copy)]
enum NoteList {
    Messages,
    Accomplishments,
}

impl NoteList {
    fn key(self) -> &'static str {
        match self {
            NoteList::Messages => "messages",
            NoteList::Accomplishments => "accomplishments",
        }
    }

    fn item_key(self) -> &'static str {
        match self {
            NoteList::Messages => "message",
            NoteList::Accomplishments => "accomplishment",
        }
    }

    fn slot(self, record: &mut StudentRecord) -> &mut Vec<String> {
        match self {
            NoteList::Messages => &mut record.messages,
            NoteList::Accomplishments => &mut record.accomplishments,
        }
    }

    fn updated_message(self) -> &'static str {
        match self {
            NoteList::Messages => "Messages updated successfully",
            NoteList::Accomplishments => "Accomplishments updated successfully",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastParams {
    message: Option<String>,
    selected_department: Option<String>,
}

fn email_of(params: &serde_json::Value) -> Result<String, HandlerErr> {
    let email = params
        .get("email")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    required_text(email, "email")
}

fn replace_list(
    conn: &Connection,
    params: &serde_json::Value,
    list: NoteList,
) -> Result<serde_json::Value, HandlerErr> {
    let email = email_of(params)?;
    let raw = params
        .get(list.key())
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", list.key())))?;
    let items: Vec<String> = parse_params(&raw)?;

    let mut record = update_student(conn, &email, |r| {
        *list.slot(r) = items;
        Ok(())
    })?;
    let count = list.slot(&mut record).len();
    Ok(json!({
        "success": true,
        "message": list.updated_message(),
        "count": count,
    }))
}

fn append_item(
    conn: &Connection,
    params: &serde_json::Value,
    list: NoteList,
) -> Result<serde_json::Value, HandlerErr> {
    let email = email_of(params)?;
    let item = params
        .get(list.item_key())
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let item = required_text(item, list.item_key())?;

    let mut record = update_student(conn, &email, |r| {
        list.slot(r).push(item);
        Ok(())
    })?;
    let count = list.slot(&mut record).len();
    Ok(json!({
        "success": true,
        "message": list.updated_message(),
        "count": count,
    }))
}

/// Replaces the message list of every record in a department, in email order.
/// The first failed write stops the loop; earlier records keep the message.
fn send_to_department(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let p: BroadcastParams = parse_params(params)?;
    let message = required_text(p.message, "message")?;
    let department = non_empty(p.selected_department)
        .ok_or_else(|| HandlerErr::bad_params("missing selectedDepartment"))?;

    let filter = CohortFilter {
        department: Some(department.clone()),
        ..Default::default()
    };
    let records = db::list_students(conn, &filter)
        .map_err(|e| HandlerErr::store("db_query_failed", e))?;

    let mut sent = 0usize;
    for mut record in records {
        record.messages = vec![message.clone()];
        save_student(conn, &record)?;
        sent += 1;
    }
    log::info!("message sent to {} record(s) in {}", sent, department);

    Ok(json!({
        "success": true,
        "message": "Message sent successfully",
        "recipients": sent,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "messages.update" => Some(with_conn(state, req, |conn, p| {
            replace_list(conn, p, NoteList::Messages)
        })),
        "accomplishments.update" => Some(with_conn(state, req, |conn, p| {
            replace_list(conn, p, NoteList::Accomplishments)
        })),
        "messages.append" => Some(with_conn(state, req, |conn, p| {
            append_item(conn, p, NoteList::Messages)
        })),
        "accomplishments.append" => Some(with_conn(state, req, |conn, p| {
            append_item(conn, p, NoteList::Accomplishments)
        })),
        "messages.sendToDepartment" => Some(with_conn(state, req, send_to_department)),
        _ => None,
    }
}
