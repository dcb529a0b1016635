mod attendance;
mod auth;
mod cache;
mod calc;
mod cli;
mod db;
mod ipc;
mod model;

use clap::Parser;
use env_logger::{Env, Target};
use serde_json::json;
use std::io::{self, BufRead, Write};

fn main() {
    // stdout carries the protocol, so logs go to stderr.
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .init();

    let args = cli::Args::parse();
    let mut state = ipc::AppState::new();
    if let Some(path) = args.workspace.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            log::error!("failed to open workspace {}: {:#}", path.to_string_lossy(), e);
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                log::error!("stdin read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                log::warn!("rejected malformed request: {}", e);
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string(), "status": 400 }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
