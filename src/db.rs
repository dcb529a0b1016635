use crate::model::{CohortFilter, StudentRecord};
use anyhow::{anyhow, Context};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};

pub const DB_FILE_NAME: &str = "edutainment.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE_NAME)
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(db_path(workspace))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            email TEXT PRIMARY KEY,
            role TEXT NOT NULL,
            department TEXT,
            class_name TEXT,
            institute_name TEXT,
            doc TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_cohort
         ON students(department, class_name, institute_name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_role_institute
         ON students(role, institute_name)",
        [],
    )?;

    Ok(conn)
}

fn encode_doc(record: &StudentRecord) -> anyhow::Result<String> {
    serde_json::to_string(record)
        .with_context(|| format!("failed to serialize record {}", record.email))
}

fn decode_doc(email: &str, doc: &str) -> anyhow::Result<StudentRecord> {
    serde_json::from_str(doc).with_context(|| format!("stored record {} is not valid", email))
}

fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Returns `false` when a record with this email already exists.
pub fn insert_student(conn: &Connection, record: &StudentRecord) -> anyhow::Result<bool> {
    let doc = encode_doc(record)?;
    let res = conn.execute(
        "INSERT INTO students(email, role, department, class_name, institute_name, doc, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &record.email,
            record.role.as_str(),
            &record.department,
            &record.class,
            &record.institute_name,
            &doc,
            now_stamp(),
        ),
    );
    match res {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Ok(false)
        }
        Err(e) => Err(e).with_context(|| format!("failed to insert record {}", record.email)),
    }
}

pub fn find_student(conn: &Connection, email: &str) -> anyhow::Result<Option<StudentRecord>> {
    let doc: Option<String> = conn
        .query_row("SELECT doc FROM students WHERE email = ?", [email], |r| {
            r.get(0)
        })
        .optional()
        .with_context(|| format!("failed to query record {}", email))?;
    doc.map(|d| decode_doc(email, &d)).transpose()
}

/// Whole-document replace of an existing record. Last write wins.
pub fn save_student(conn: &Connection, record: &StudentRecord) -> anyhow::Result<()> {
    let doc = encode_doc(record)?;
    let changed = conn
        .execute(
            "UPDATE students
             SET role = ?, department = ?, class_name = ?, institute_name = ?, doc = ?, updated_at = ?
             WHERE email = ?",
            (
                record.role.as_str(),
                &record.department,
                &record.class,
                &record.institute_name,
                &doc,
                now_stamp(),
                &record.email,
            ),
        )
        .with_context(|| format!("failed to update record {}", record.email))?;
    if changed == 0 {
        return Err(anyhow!("record {} no longer exists", record.email));
    }
    Ok(())
}

/// Records matching `filter`, ordered by email.
pub fn list_students(conn: &Connection, filter: &CohortFilter) -> anyhow::Result<Vec<StudentRecord>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();
    if let Some(role) = filter.role {
        clauses.push("role = ?");
        args.push(Value::Text(role.as_str().to_string()));
    }
    if let Some(dept) = &filter.department {
        clauses.push("department = ?");
        args.push(Value::Text(dept.clone()));
    }
    if let Some(class) = &filter.class {
        clauses.push("class_name = ?");
        args.push(Value::Text(class.clone()));
    }
    if let Some(inst) = &filter.institute_name {
        clauses.push("institute_name = ?");
        args.push(Value::Text(inst.clone()));
    }

    let mut sql = String::from("SELECT email, doc FROM students");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY email");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .context("failed to query records")?;

    rows.iter()
        .map(|(email, doc)| decode_doc(email, doc))
        .collect()
}

pub fn count_students(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?)
}
