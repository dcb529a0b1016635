use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    load_cohort, load_student, non_empty, parse_params, required_text, respond, update_student,
    with_conn,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{CohortFilter, IatScores, Residence, Role, StudentRecord, Subject};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

/// Optional profile and cohort fields, shared by signup and profile updates.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub register_number: Option<String>,
    pub gender: Option<String>,
    pub residence: Option<String>,
    pub department: Option<String>,
    pub class: Option<String>,
    pub institute_name: Option<String>,
}

impl ProfilePatch {
    /// Only fields that are present and non-blank overwrite the record.
    pub fn apply(self, record: &mut StudentRecord) -> Result<(), HandlerErr> {
        if let Some(r) = non_empty(self.residence) {
            let residence = Residence::parse(&r)
                .ok_or_else(|| HandlerErr::bad_params("residence must be hostel or day-scholar"))?;
            record.residence = Some(residence);
        }
        let fields = [
            (self.name, &mut record.name),
            (self.register_number, &mut record.register_number),
            (self.gender, &mut record.gender),
            (self.department, &mut record.department),
            (self.class, &mut record.class),
            (self.institute_name, &mut record.institute_name),
        ];
        for (value, slot) in fields {
            if let Some(v) = non_empty(value) {
                *slot = Some(v);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct EmailParams {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    role: Option<String>,
    department: Option<String>,
    institute_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileParams {
    email: Option<String>,
    #[serde(flatten)]
    profile: ProfilePatch,
}

#[derive(Debug, Deserialize)]
struct ReplaceSubjectsParams {
    email: Option<String>,
    subjects: Option<Vec<Subject>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetScoreParams {
    email: Option<String>,
    subject_code: Option<String>,
    subject_name: Option<String>,
    iat: Option<usize>,
    #[serde(default)]
    score: serde_json::Value,
}

fn parse_role(raw: Option<String>) -> Result<Option<Role>, HandlerErr> {
    match non_empty(raw) {
        None => Ok(None),
        Some(r) => Role::parse(&r)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params("role must be student or admin")),
    }
}

fn score_text(value: &serde_json::Value) -> Result<Option<String>, HandlerErr> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(non_empty(Some(s.clone()))),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(HandlerErr::bad_params("score must be a string, number or null")),
    }
}

fn students_get(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: EmailParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let record = load_student(conn, &email)?;
    Ok(record.view())
}

fn list_with_filter(state: &mut AppState, filter: CohortFilter) -> Result<serde_json::Value, HandlerErr> {
    let records = load_cohort(state, &filter)?;
    let students: Vec<serde_json::Value> = records.iter().map(StudentRecord::view).collect();
    Ok(json!({ "students": students }))
}

fn students_list(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: ListParams = parse_params(params)?;
    let filter = CohortFilter {
        role: parse_role(p.role)?,
        department: non_empty(p.department),
        class: None,
        institute_name: non_empty(p.institute_name),
    };
    list_with_filter(state, filter)
}

fn students_list_by_institute(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let p: ListParams = parse_params(params)?;
    let filter = CohortFilter {
        role: parse_role(p.role)?,
        department: None,
        class: None,
        institute_name: non_empty(p.institute_name),
    };
    list_with_filter(state, filter)
}

fn students_update_profile(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let p: UpdateProfileParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let record = update_student(conn, &email, |r| p.profile.apply(r))?;
    Ok(json!({
        "success": true,
        "message": "Profile updated successfully",
        "student": record.view(),
    }))
}

fn subjects_replace(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: ReplaceSubjectsParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let subjects = p
        .subjects
        .ok_or_else(|| HandlerErr::bad_params("missing subjects"))?;
    if subjects.iter().any(|s| s.subject_code.trim().is_empty()) {
        return Err(HandlerErr::bad_params("every subject needs a subject_code"));
    }
    let count = subjects.len();
    update_student(conn, &email, |r| {
        r.subjects = subjects;
        Ok(())
    })?;
    Ok(json!({
        "success": true,
        "message": "Subjects updated successfully",
        "subjectCount": count,
    }))
}

fn scores_set(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: SetScoreParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let code = required_text(p.subject_code, "subjectCode")?;
    let iat = p.iat.ok_or_else(|| HandlerErr::bad_params("missing iat"))?;
    if !(1..=IatScores::COUNT).contains(&iat) {
        return Err(
            HandlerErr::bad_params("iat must be 1, 2 or 3").with_details(json!({ "iat": iat }))
        );
    }
    let score = score_text(&p.score)?;
    let name = non_empty(p.subject_name);

    let record = update_student(conn, &email, |r| {
        if r.subject_mut(&code).is_none() {
            r.subjects.push(Subject {
                subject_code: code.clone(),
                ..Default::default()
            });
        }
        if let Some(subject) = r.subject_mut(&code) {
            if let Some(n) = name {
                subject.subject_name = n;
            }
            subject.scores.set(iat, score);
        }
        Ok(())
    })?;

    let subject = record.subjects.iter().find(|s| s.subject_code == code);
    Ok(json!({
        "success": true,
        "message": "Score updated successfully",
        "subject": subject,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.get" => Some(with_conn(state, req, students_get)),
        "students.list" => Some(respond(req, students_list(state, &req.params))),
        "students.listByInstitute" => {
            Some(respond(req, students_list_by_institute(state, &req.params)))
        }
        "students.updateProfile" => Some(with_conn(state, req, students_update_profile)),
        "subjects.replace" => Some(with_conn(state, req, subjects_replace)),
        "scores.set" => Some(with_conn(state, req, scores_set)),
        _ => None,
    }
}
