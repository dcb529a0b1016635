mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{
    request, request_err, request_ok, select_workspace, signup_student, spawn_sidecar, temp_dir,
};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("edutainment-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert!(health.get("workspacePath").map(|v| v.is_null()).unwrap_or(false));

    let no_ws = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "students.get",
        json!({ "email": "a@x.edu" }),
    );
    assert_eq!(no_ws["code"], "no_workspace");
    assert_eq!(no_ws["status"], 400);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let calls = vec![
        (
            "auth.signup",
            json!({ "email": "a@x.edu", "password": "pw", "department": "CSE", "class": "II", "instituteName": "X" }),
        ),
        ("auth.login", json!({ "email": "a@x.edu", "password": "pw" })),
        ("auth.adminLogin", json!({ "email": "a@x.edu", "password": "pw" })),
        ("students.get", json!({ "email": "a@x.edu" })),
        ("students.list", json!({})),
        ("students.listByInstitute", json!({ "instituteName": "X" })),
        ("students.updateProfile", json!({ "email": "a@x.edu", "gender": "F" })),
        (
            "subjects.replace",
            json!({ "email": "a@x.edu", "subjects": [{ "subject_code": "CS1", "subject_name": "Intro" }] }),
        ),
        (
            "scores.set",
            json!({ "email": "a@x.edu", "subjectCode": "CS1", "iat": 1, "score": "75" }),
        ),
        (
            "attendance.mark",
            json!({ "email": "a@x.edu", "date": "2024-03-01", "present": true }),
        ),
        (
            "attendance.updateAll",
            json!({ "date": "2024-03-02", "present": {}, "selectedDepartment": "CSE", "selectedYear": "II", "instituteName": "X" }),
        ),
        ("attendance.monthly", json!({ "email": "a@x.edu" })),
        ("messages.update", json!({ "email": "a@x.edu", "messages": [] })),
        ("messages.append", json!({ "email": "a@x.edu", "message": "hi" })),
        (
            "messages.sendToDepartment",
            json!({ "message": "all", "selectedDepartment": "CSE" }),
        ),
        ("accomplishments.update", json!({ "email": "a@x.edu", "accomplishments": [] })),
        (
            "accomplishments.append",
            json!({ "email": "a@x.edu", "accomplishment": "won" }),
        ),
        ("analytics.studentSummary", json!({ "email": "a@x.edu" })),
        ("analytics.cohortReport", json!({})),
        ("analytics.dailyAttendance", json!({ "date": "2024-03-01" })),
        ("analytics.subjectComparison", json!({ "email": "a@x.edu", "iat": 1 })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &format!("c{}", i), method, params);
        let code = resp
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        assert_ne!(code, "not_implemented", "unknown method {}", method);
    }

    let unknown = request_err(&mut stdin, &mut reader, "u", "classes.create", json!({}));
    assert_eq!(unknown["code"], "not_implemented");
    assert_eq!(unknown["status"], 404);

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json response");
    let bad: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(bad["ok"], false);
    assert_eq!(bad["error"]["code"], "bad_json");

    // The loop keeps serving after a malformed line.
    let _ = request_ok(&mut stdin, &mut reader, "after", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn workspace_flag_opens_database_at_startup() {
    let workspace = temp_dir("edutainment-startup-flag");
    let exe = env!("CARGO_BIN_EXE_edutainmentd");
    let mut child = std::process::Command::new(exe)
        .arg("--workspace")
        .arg(&workspace)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .expect("spawn edutainmentd");
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut reader = std::io::BufReader::new(child.stdout.take().expect("child stdout"));

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health["workspacePath"].as_str(),
        Some(workspace.to_string_lossy().as_ref())
    );
    assert!(workspace.join("edutainment.sqlite3").is_file());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_bundle_methods_leave_workspace_open() {
    let workspace = temp_dir("edutainment-no-bundles");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    signup_student(&mut stdin, &mut reader, "a@x.edu", "CSE", "II", "X");

    let missing_bundle = workspace.join("missing.zip");
    for (i, method) in ["backup.importWorkspaceBundle", "backup.exportWorkspaceBundle"]
        .iter()
        .enumerate()
    {
        let err = request_err(
            &mut stdin,
            &mut reader,
            &format!("b{}", i),
            method,
            json!({ "inPath": missing_bundle.to_string_lossy(), "outPath": missing_bundle.to_string_lossy() }),
        );
        assert_eq!(err["code"], "not_implemented");
    }

    let health = request_ok(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(
        health["workspacePath"].as_str(),
        Some(workspace.to_string_lossy().as_ref())
    );
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "g",
        "students.get",
        json!({ "email": "a@x.edu" }),
    );
    assert_eq!(student["email"], "a@x.edu");
    assert!(!missing_bundle.exists());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
