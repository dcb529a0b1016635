mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, select_workspace, signup_student, spawn_sidecar, temp_dir};

#[test]
fn lists_are_replaced_appended_and_broadcast() {
    let workspace = temp_dir("edutainment-messages");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    signup_student(&mut stdin, &mut reader, "a@x.edu", "CSE", "II", "X");
    signup_student(&mut stdin, &mut reader, "b@x.edu", "CSE", "III", "Y");
    signup_student(&mut stdin, &mut reader, "c@x.edu", "ECE", "II", "X");

    let replaced = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "messages.update",
        json!({ "email": "a@x.edu", "messages": ["one", "two"] }),
    );
    assert_eq!(replaced["count"], 2);

    let appended = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "messages.append",
        json!({ "email": "a@x.edu", "message": "three" }),
    );
    assert_eq!(appended["count"], 3);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "accomplishments.update",
        json!({ "email": "a@x.edu", "accomplishments": ["Hackathon winner"] }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "accomplishments.append",
        json!({ "email": "a@x.edu", "accomplishment": "Chess finalist" }),
    );

    let a = request_ok(&mut stdin, &mut reader, "5", "students.get", json!({ "email": "a@x.edu" }));
    assert_eq!(a["messages"], json!(["one", "two", "three"]));
    assert_eq!(a["accomplishments"], json!(["Hackathon winner", "Chess finalist"]));

    let sent = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "messages.sendToDepartment",
        json!({ "message": "Exam on Monday", "selectedDepartment": "CSE" }),
    );
    assert_eq!(sent["recipients"], 2);

    let a = request_ok(&mut stdin, &mut reader, "7", "students.get", json!({ "email": "a@x.edu" }));
    let b = request_ok(&mut stdin, &mut reader, "8", "students.get", json!({ "email": "b@x.edu" }));
    let c = request_ok(&mut stdin, &mut reader, "9", "students.get", json!({ "email": "c@x.edu" }));
    assert_eq!(a["messages"], json!(["Exam on Monday"]));
    assert_eq!(b["messages"], json!(["Exam on Monday"]));
    assert_eq!(c["messages"], json!([]));
    assert_eq!(a["accomplishments"].as_array().map(|v| v.len()), Some(2));

    let not_list = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "messages.update",
        json!({ "email": "a@x.edu", "messages": "flat string" }),
    );
    assert_eq!(not_list["code"], "bad_params");

    let missing = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "accomplishments.update",
        json!({ "email": "ghost@x.edu", "accomplishments": [] }),
    );
    assert_eq!(missing["code"], "not_found");

    let no_dept = request_err(
        &mut stdin,
        &mut reader,
        "12",
        "messages.sendToDepartment",
        json!({ "message": "hello" }),
    );
    assert_eq!(no_dept["code"], "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
