mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_workspace, spawn_sidecar, temp_dir};

#[test]
fn duplicate_signup_is_rejected_and_store_keeps_one_record() {
    let workspace = temp_dir("edutainment-auth-dup");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "auth.signup",
        json!({ "email": "ana@x.edu", "password": "secret", "name": "Ana" }),
    );
    assert_eq!(created["success"], true);
    assert_eq!(created["message"], "User registered successfully");

    let dup = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "auth.signup",
        json!({ "email": "ana@x.edu", "password": "other" }),
    );
    assert_eq!(dup["code"], "already_exists");
    assert_eq!(dup["status"], 400);
    assert_eq!(dup["message"], "User already exists");

    drop(stdin);
    let _ = child.wait();

    let conn = rusqlite::Connection::open(workspace.join("edutainment.sqlite3")).expect("open db");
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM students WHERE email = 'ana@x.edu'",
            [],
            |r| r.get(0),
        )
        .expect("count");
    assert_eq!(count, 1);
    let doc: String = conn
        .query_row(
            "SELECT doc FROM students WHERE email = 'ana@x.edu'",
            [],
            |r| r.get(0),
        )
        .expect("doc");
    assert!(!doc.contains("\"secret\""), "password stored in clear: {}", doc);
    assert!(doc.contains("$argon2id$"), "password not stored as argon2id: {}", doc);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn login_checks_password_and_reports_role() {
    let workspace = temp_dir("edutainment-auth-login");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "auth.signup",
        json!({ "email": "ben@x.edu", "password": "pw1" }),
    );

    let ok = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.login",
        json!({ "email": "ben@x.edu", "password": "pw1" }),
    );
    assert_eq!(ok["success"], true);
    assert_eq!(ok["role"], "student");

    let wrong = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "email": "ben@x.edu", "password": "nope" }),
    );
    assert_eq!(wrong["code"], "auth_failed");
    assert_eq!(wrong["status"], 401);

    let unknown = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "email": "ghost@x.edu", "password": "pw1" }),
    );
    assert_eq!(unknown["code"], "auth_failed");

    let missing = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "auth.signup",
        json!({ "email": "carl@x.edu" }),
    );
    assert_eq!(missing["code"], "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn admin_login_requires_admin_role_and_admin_password() {
    let workspace = temp_dir("edutainment-auth-admin");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let no_admin_pw = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "auth.signup",
        json!({ "email": "boss@x.edu", "password": "pw", "role": "admin" }),
    );
    assert_eq!(no_admin_pw["code"], "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.signup",
        json!({
            "email": "boss@x.edu",
            "password": "pw",
            "role": "admin",
            "adminPassword": "master",
            "instituteName": "X"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "auth.signup",
        json!({ "email": "kid@x.edu", "password": "master" }),
    );

    let admin = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.adminLogin",
        json!({ "email": "boss@x.edu", "password": "master" }),
    );
    assert_eq!(admin["success"], true);

    let login_pw_is_not_admin_pw = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "auth.adminLogin",
        json!({ "email": "boss@x.edu", "password": "pw" }),
    );
    assert_eq!(login_pw_is_not_admin_pw["code"], "auth_failed");

    let student = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "auth.adminLogin",
        json!({ "email": "kid@x.edu", "password": "master" }),
    );
    assert_eq!(student["code"], "auth_failed");

    let role = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "auth.login",
        json!({ "email": "boss@x.edu", "password": "pw" }),
    );
    assert_eq!(role["role"], "admin");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
