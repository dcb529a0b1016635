use crate::db;
use crate::model::{CohortFilter, Role, StudentRecord};
use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use std::collections::HashMap;

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp; timestamps collapse to their UTC day.
pub fn parse_attendance_date(raw: &str) -> anyhow::Result<NaiveDate> {
    let t = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(t) {
        return Ok(ts.with_timezone(&Utc).date_naive());
    }
    Err(anyhow!(
        "date must be YYYY-MM-DD or an RFC 3339 timestamp, got {:?}",
        raw
    ))
}

/// Students of one department / class / institute.
pub fn cohort_filter(department: &str, class: &str, institute_name: &str) -> CohortFilter {
    CohortFilter {
        role: Some(Role::Student),
        department: Some(department.to_string()),
        class: Some(class.to_string()),
        institute_name: Some(institute_name.to_string()),
    }
}

/// Unmapped students count as absent.
pub fn marked_present(present: &HashMap<String, bool>, email: &str) -> bool {
    present.get(email).copied().unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CohortUpdateSummary {
    pub updated: usize,
    pub marked_present: usize,
    pub marked_absent: usize,
}

/// Marks every student of the cohort for `date` and persists each one in turn.
///
/// There is no surrounding transaction: the first failed write stops the batch
/// and is returned, while students written before it keep their update.
pub fn apply_cohort_attendance(
    conn: &Connection,
    cohort: &CohortFilter,
    date: NaiveDate,
    present: &HashMap<String, bool>,
) -> anyhow::Result<CohortUpdateSummary> {
    let students = db::list_students(conn, cohort).context("failed to load cohort")?;
    let mut summary = CohortUpdateSummary::default();

    for mut student in students {
        let is_present = marked_present(present, &student.email);
        student.attendance.mark(date, is_present);
        db::save_student(conn, &student).with_context(|| {
            format!(
                "cohort attendance for {} stopped at {} ({} already written)",
                date, student.email, summary.updated
            )
        })?;

        summary.updated += 1;
        if is_present {
            summary.marked_present += 1;
        } else {
            summary.marked_absent += 1;
        }
    }

    Ok(summary)
}

/// Single-student form of the same update. `None` when the email is unknown.
pub fn mark_attendance(
    conn: &Connection,
    email: &str,
    date: NaiveDate,
    present: bool,
) -> anyhow::Result<Option<StudentRecord>> {
    let Some(mut student) = db::find_student(conn, email)? else {
        return Ok(None);
    };
    student.attendance.mark(date, present);
    db::save_student(conn, &student)?;
    Ok(Some(student))
}
