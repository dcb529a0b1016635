use crate::attendance;
use crate::calc;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{load_student, parse_date, parse_params, required_text, with_conn};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct MarkParams {
    email: Option<String>,
    date: Option<String>,
    present: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAllParams {
    date: Option<String>,
    present: Option<HashMap<String, bool>>,
    selected_department: Option<String>,
    selected_year: Option<String>,
    institute_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MonthlyParams {
    email: Option<String>,
    year: Option<i32>,
}

fn attendance_mark(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: MarkParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let date = parse_date(&required_text(p.date, "date")?)?;
    let present = p
        .present
        .ok_or_else(|| HandlerErr::bad_params("missing present"))?;

    let record = attendance::mark_attendance(conn, &email, date, present)
        .map_err(|e| HandlerErr::store("db_update_failed", e))?
        .ok_or_else(|| HandlerErr::not_found("Student not found"))?;

    Ok(json!({
        "success": true,
        "message": "Attendance updated successfully",
        "date": date,
        "present": present,
        "totalAttendance": record.attendance.total_attendance(),
        "totalDays": record.attendance.total_days(),
    }))
}

fn attendance_update_all(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let p: UpdateAllParams = parse_params(params)?;
    let date = parse_date(&required_text(p.date, "date")?)?;
    let present = p
        .present
        .ok_or_else(|| HandlerErr::bad_params("missing present"))?;
    let department = required_text(p.selected_department, "selectedDepartment")?;
    let class = required_text(p.selected_year, "selectedYear")?;
    let institute = required_text(p.institute_name, "instituteName")?;

    let cohort = attendance::cohort_filter(&department, &class, &institute);
    let summary = attendance::apply_cohort_attendance(conn, &cohort, date, &present)
        .map_err(|e| HandlerErr::store("db_update_failed", e))?;
    log::info!(
        "attendance for {} / {} / {} on {}: {} updated, {} present, {} absent",
        institute,
        department,
        class,
        date,
        summary.updated,
        summary.marked_present,
        summary.marked_absent
    );

    Ok(json!({
        "success": true,
        "message": "Attendance updated successfully for the selected department",
        "updated": summary.updated,
        "markedPresent": summary.marked_present,
        "markedAbsent": summary.marked_absent,
    }))
}

fn attendance_monthly(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: MonthlyParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let record = load_student(conn, &email)?;
    let months = calc::monthly_attendance(&record.attendance, p.year);
    Ok(json!({
        "email": record.email,
        "year": p.year,
        "months": months,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(with_conn(state, req, attendance_mark)),
        "attendance.updateAll" => Some(with_conn(state, req, attendance_update_all)),
        "attendance.monthly" => Some(with_conn(state, req, attendance_monthly)),
        _ => None,
    }
}
