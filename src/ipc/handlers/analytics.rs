use crate::calc::{self, FeedbackBand, TagKind};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    load_cohort, load_student, non_empty, parse_date, parse_params, require_db, required_text,
    respond, with_conn,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{CohortFilter, IatScores, Role, StudentRecord};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct StudentSummaryParams {
    email: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ComparisonParams {
    email: Option<String>,
    iat: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportParams {
    calendar_year: Option<i32>,
    #[serde(flatten)]
    cohort: CohortParams,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CohortParams {
    department: Option<String>,
    year: Option<String>,
    institute_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyParams {
    date: Option<String>,
    #[serde(flatten)]
    cohort: CohortParams,
}

impl CohortParams {
    /// `year` is the class label (e.g. "III"), not a calendar year.
    fn filter(self) -> CohortFilter {
        CohortFilter {
            role: Some(Role::Student),
            department: non_empty(self.department),
            class: non_empty(self.year),
            institute_name: non_empty(self.institute_name),
        }
    }
}

fn round(v: Option<f64>) -> Option<f64> {
    v.map(calc::round_off_2_decimals)
}

fn feedback_json(score: Option<f64>) -> serde_json::Value {
    let band = FeedbackBand::for_score(score);
    json!({ "band": band, "message": band.message() })
}

fn student_row(record: &StudentRecord) -> serde_json::Value {
    let overall = calc::overall_score(record);
    json!({
        "email": record.email,
        "name": record.name,
        "registerNumber": record.register_number,
        "class": record.class,
        "scoreAverage": round(calc::score_average(record)),
        "attendancePercentage": round(calc::attendance_percentage(&record.attendance)),
        "totalAttendance": record.attendance.total_attendance(),
        "totalDays": record.attendance.total_days(),
        "overallScore": round(overall),
        "feedbackBand": FeedbackBand::for_score(overall),
    })
}

fn standing_json(s: calc::SubjectStanding) -> serde_json::Value {
    json!({
        "subjectCode": s.subject_code,
        "subjectName": s.subject_name,
        "average": calc::round_off_2_decimals(s.average),
    })
}

fn rounded_comparison(rows: Vec<calc::SubjectComparison>) -> Vec<calc::SubjectComparison> {
    rows.into_iter()
        .map(|r| calc::SubjectComparison {
            student: round(r.student),
            lowest: round(r.lowest),
            average: round(r.average),
            highest: round(r.highest),
            ..r
        })
        .collect()
}

fn iat_breakdown(records: &[StudentRecord], kind: TagKind) -> serde_json::Value {
    let profile: BTreeMap<String, [Option<f64>; IatScores::COUNT]> = calc::iat_profile_by_tag(records, kind)
        .into_iter()
        .map(|(tag, row)| (tag, row.map(round)))
        .collect();
    json!(profile)
}

fn student_summary(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let p: StudentSummaryParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let record = load_student(conn, &email)?;

    let subjects: Vec<serde_json::Value> = record
        .subjects
        .iter()
        .map(|s| {
            json!({
                "subjectCode": s.subject_code,
                "subjectName": s.subject_name,
                "average": round(calc::subject_average(s)),
            })
        })
        .collect();
    let overall = calc::overall_score(&record);
    let (highest, lowest) = match calc::subject_extremes(&record) {
        Some((h, l)) => (standing_json(h), standing_json(l)),
        None => (serde_json::Value::Null, serde_json::Value::Null),
    };

    Ok(json!({
        "email": record.email,
        "name": record.name,
        "subjects": subjects,
        "iatAverages": calc::iat_averages(&record).map(round),
        "highestSubject": highest,
        "lowestSubject": lowest,
        "scoreAverage": round(calc::score_average(&record)),
        "attendancePercentage": round(calc::attendance_percentage(&record.attendance)),
        "totalAttendance": record.attendance.total_attendance(),
        "totalDays": record.attendance.total_days(),
        "overallScore": round(overall),
        "feedback": feedback_json(overall),
        "monthlyAttendance": calc::monthly_attendance(&record.attendance, p.year),
    }))
}

/// Peers are the student's own department, class and institute.
fn subject_comparison(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let p: ComparisonParams = parse_params(params)?;
    let email = required_text(p.email, "email")?;
    let iats: Vec<usize> = match p.iat {
        Some(iat) if (1..=IatScores::COUNT).contains(&iat) => vec![iat],
        Some(iat) => {
            return Err(
                HandlerErr::bad_params("iat must be 1, 2 or 3").with_details(json!({ "iat": iat }))
            )
        }
        None => (1..=IatScores::COUNT).collect(),
    };

    let record = load_student(require_db(state)?, &email)?;
    let filter = CohortFilter {
        role: Some(Role::Student),
        department: record.department.clone(),
        class: record.class.clone(),
        institute_name: record.institute_name.clone(),
    };
    let cohort = load_cohort(state, &filter)?;

    let by_iat: Vec<serde_json::Value> = iats
        .into_iter()
        .map(|iat| {
            let rows = calc::subject_iat_comparison(&record, cohort.as_slice(), iat);
            json!({ "iat": iat, "subjects": rounded_comparison(rows) })
        })
        .collect();

    Ok(json!({
        "email": record.email,
        "cohortSize": cohort.len(),
        "comparisons": by_iat,
    }))
}

fn cohort_report(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: ReportParams = parse_params(params)?;
    let records = load_cohort(state, &p.cohort.filter())?;
    let records = records.as_slice();

    let rows: Vec<serde_json::Value> = records.iter().map(student_row).collect();
    let test_average = calc::mean(records.iter().filter_map(calc::score_average));
    let attendance_average = calc::mean(
        records
            .iter()
            .filter_map(|r| calc::attendance_percentage(&r.attendance)),
    );
    let histogram = calc::score_histogram(records);
    let class_averages: BTreeMap<String, Option<f64>> = calc::class_test_averages(records)
        .into_iter()
        .map(|(class, avg)| (class, round(avg)))
        .collect();
    let department_averages: BTreeMap<String, Option<f64>> = calc::department_overall_averages(records)
        .into_iter()
        .map(|(department, avg)| (department, round(avg)))
        .collect();

    Ok(json!({
        "studentCount": records.len(),
        "rows": rows,
        "testAverage": round(test_average),
        "attendanceAverage": round(attendance_average),
        "histogram": histogram.bins(),
        "histogramTotal": histogram.total(),
        "iatByGender": iat_breakdown(records, TagKind::Gender),
        "iatByResidence": iat_breakdown(records, TagKind::Residence),
        "classTestAverages": class_averages,
        "departmentAverages": department_averages,
        "monthlyAttendance": calc::cohort_monthly_attendance(records, p.calendar_year),
    }))
}

fn daily_report(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let p: DailyParams = parse_params(params)?;
    let date = parse_date(&required_text(p.date, "date")?)?;
    let records = load_cohort(state, &p.cohort.filter())?;

    let records = records.as_slice();

    Ok(json!({
        "summary": calc::daily_attendance(records, date),
        "byClass": calc::daily_attendance_by(records, date, |r| r.class.as_deref()),
        "byDepartment": calc::daily_attendance_by(records, date, |r| r.department.as_deref()),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.studentSummary" => Some(with_conn(state, req, student_summary)),
        "analytics.subjectComparison" => {
            Some(respond(req, subject_comparison(state, &req.params)))
        }
        "analytics.cohortReport" => Some(respond(req, cohort_report(state, &req.params))),
        "analytics.dailyAttendance" => Some(respond(req, daily_report(state, &req.params))),
        _ => None,
    }
}
