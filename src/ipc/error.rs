use serde_json::json;

pub const GENERIC_STORE_MESSAGE: &str = "Internal Server Error";

/// HTTP-style outcome class reported alongside each error code.
pub fn status_for(code: &str) -> u16 {
    match code {
        "bad_json" | "bad_params" | "already_exists" | "no_workspace" => 400,
        "auth_failed" => 401,
        "not_found" | "not_implemented" => 404,
        _ => 500,
    }
}

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
        "status": status_for(code),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn auth_failed() -> Self {
        Self::new("auth_failed", "Authentication failed")
    }

    pub fn no_workspace() -> Self {
        Self::new("no_workspace", "select a workspace first")
    }

    /// Store failures reach the caller only as a generic message; the cause is logged here.
    pub fn store(code: &'static str, error: anyhow::Error) -> Self {
        log::error!("{}: {:#}", code, error);
        Self::new(code, GENERIC_STORE_MESSAGE)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}
